use lazy_static::lazy_static;

/// Number of steps in one full turn of the angle tables.
pub const ANGLE_STEPS: usize = 2048;

lazy_static! {
    /// 16.16 fixed-point sine over a 2048-step turn.
    static ref SIN: [i32; ANGLE_STEPS] = {
        let mut table = [0i32; ANGLE_STEPS];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = ((i as f64 * std::f64::consts::TAU / ANGLE_STEPS as f64).sin() * 65536.0) as i32;
        }
        table
    };

    /// 16.16 fixed-point cosine over a 2048-step turn.
    static ref COS: [i32; ANGLE_STEPS] = {
        let mut table = [0i32; ANGLE_STEPS];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = ((i as f64 * std::f64::consts::TAU / ANGLE_STEPS as f64).cos() * 65536.0) as i32;
        }
        table
    };
}

pub fn sin(angle: usize) -> i32 {
    SIN[angle & (ANGLE_STEPS - 1)]
}

pub fn cos(angle: usize) -> i32 {
    COS[angle & (ANGLE_STEPS - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns() {
        assert_eq!(sin(0), 0);
        assert_eq!(cos(0), 65536);
        assert_eq!(sin(512), 65536);
        assert!(cos(512).abs() < 2);
        assert!((sin(1024)).abs() < 2);
        assert_eq!(cos(1024), -65536);
    }

    #[test]
    fn wraps_past_full_turn() {
        assert_eq!(sin(2048), sin(0));
        assert_eq!(cos(2048 + 512), cos(512));
    }
}
