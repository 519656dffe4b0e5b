pub fn average(values: &[u64]) -> f64 {
    let sum: u64 = values.iter().sum();
    (sum as f64 / values.len() as f64 * 100.0).floor() / 100.0
}
