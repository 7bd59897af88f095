#[macro_export]
macro_rules! assert_eq_unordered {
    ($actual:expr, $expect:expr) => {
        let mut vals = Vec::from_iter($actual);
        let mut expect = Vec::from_iter($expect);
        vals.sort();
        expect.sort();
        pretty_assertions::assert_eq!(vals, expect);
    };
}
