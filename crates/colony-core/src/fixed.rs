use fixed::types::I32F32;

/// Q32.32 fixed-point volume in cubic metres. Keeps capacity accounting exact.
pub type Volume = I32F32;

/// Convert an f64 to a Volume. Use only at the ingestion boundary.
#[inline]
pub fn f64_to_volume(v: f64) -> Volume {
    Volume::saturating_from_num(v)
}

/// Convert a Volume to f64. Use only for display.
#[inline]
pub fn volume_to_f64(v: Volume) -> f64 {
    v.to_num::<f64>()
}

/// Volume occupied by `quantity` units of `unit` volume each. Saturates.
#[inline]
pub fn volume_of(unit: Volume, quantity: u32) -> Volume {
    unit.saturating_mul(Volume::saturating_from_num(quantity))
}

/// Whole units of `unit` volume that fit into `available`.
///
/// Zero-volume commodities always fit, so the answer is `u32::MAX`.
pub fn units_fitting(available: Volume, unit: Volume) -> u32 {
    if available <= Volume::ZERO {
        return if unit <= Volume::ZERO { u32::MAX } else { 0 };
    }
    if unit <= Volume::ZERO {
        return u32::MAX;
    }
    match available.checked_div(unit) {
        Some(q) => q.floor().saturating_to_num::<u32>(),
        None => u32::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_of_multiplies() {
        let unit = f64_to_volume(0.5);
        assert_eq!(volume_to_f64(volume_of(unit, 12)), 6.0);
    }

    #[test]
    fn volume_of_saturates() {
        let unit = f64_to_volume(1_000_000.0);
        assert_eq!(volume_of(unit, u32::MAX), Volume::MAX);
    }

    #[test]
    fn units_fitting_floors() {
        let available = f64_to_volume(10.0);
        let unit = f64_to_volume(3.0);
        assert_eq!(units_fitting(available, unit), 3);
    }

    #[test]
    fn units_fitting_zero_volume_is_unbounded() {
        assert_eq!(units_fitting(f64_to_volume(0.0), Volume::ZERO), u32::MAX);
        assert_eq!(units_fitting(f64_to_volume(5.0), Volume::ZERO), u32::MAX);
    }

    #[test]
    fn units_fitting_no_space() {
        assert_eq!(units_fitting(Volume::ZERO, f64_to_volume(0.01)), 0);
    }

    #[test]
    fn small_volumes_are_exact_enough() {
        // 0.01 m3 per unit is the common volume for refined commodities.
        let unit = f64_to_volume(0.01);
        let cap = f64_to_volume(120.0);
        let fit = units_fitting(cap, unit);
        assert!((11_999..=12_000).contains(&fit));
    }
}
