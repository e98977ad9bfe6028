//! Configuration access port trait.

pub trait ConfigPort {
    fn sections(&self) -> Vec<String>;
    /// Raw value of `key`, or `None` when the section or key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
