use std::collections::HashMap;

/// Extract a parameter as usize with a default value
pub fn get_param_usize(params: &HashMap<String, f64>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as usize)
        .unwrap_or(default)
}

/// Extract a parameter as f64 with a default value
pub fn get_param_f64(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Get a parameter rounded to an i64
pub fn get_rounded_param(params: &HashMap<String, f64>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
        .unwrap_or(default)
}

/// Get a parameter as usize with a minimum value
pub fn get_usize_param_min(
    params: &HashMap<String, f64>,
    key: &str,
    default: usize,
    min: usize,
) -> usize {
    get_param_usize(params, key, default).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_on_missing_or_non_finite_values() {
        let mut params = HashMap::new();
        params.insert("period".to_string(), f64::NAN);
        params.insert("window".to_string(), 7.6);
        params.insert("quantity".to_string(), -3.2);

        assert_eq!(get_param_usize(&params, "period", 14), 14);
        assert_eq!(get_param_usize(&params, "window", 20), 8);
        assert_eq!(get_param_usize(&params, "missing", 5), 5);
        assert_eq!(get_rounded_param(&params, "quantity", 1), -3);
        assert_eq!(get_usize_param_min(&params, "window", 20, 10), 10);
        assert_eq!(get_param_f64(&params, "period", 30.0), 30.0);
    }
}
