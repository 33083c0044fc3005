//! The program under test and how it is located.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ExploreError, TestFailure};

/// Entry point and lifecycle hooks of a program under test.
///
/// The controlled runtime invokes the test body itself; the engine only drives
/// the hooks. Every hook may fail.
pub trait TestMethod: Send + Sync {
    /// Fully qualified name, e.g. `Tests.Deadlock`.
    fn name(&self) -> &str;

    /// Runs once before the first iteration.
    fn initialize_all_iterations(&self) -> Result<(), TestFailure> {
        Ok(())
    }

    /// Runs after every iteration.
    fn dispose_current_iteration(&self) -> Result<(), TestFailure> {
        Ok(())
    }

    /// Runs once after the last iteration.
    fn dispose_all_iterations(&self) -> Result<(), TestFailure> {
        Ok(())
    }
}

impl fmt::Debug for dyn TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TestMethod").field(&self.name()).finish()
    }
}

/// Registered test methods, by name.
#[derive(Default)]
pub struct TestRegistry {
    tests: BTreeMap<String, Arc<dyn TestMethod>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test under its own name, replacing any previous one.
    pub fn register(&mut self, test: Arc<dyn TestMethod>) -> &mut Self {
        self.tests.insert(test.name().to_string(), test);
        self
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }

    /// Selects the test to explore.
    ///
    /// With a name: the exact match, else the single test whose name ends in
    /// `.<name>`. Without a name: the only registered test.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn TestMethod>, ExploreError> {
        match name {
            Some(name) => self.resolve_named(name),
            None => {
                let mut tests = self.tests.values();
                match (tests.next(), tests.next()) {
                    (Some(test), None) => Ok(Arc::clone(test)),
                    (None, _) => Err(ExploreError::setup("<none>", "no test method is registered")),
                    (Some(_), Some(_)) => Err(ExploreError::setup(
                        "<none>",
                        format!(
                            "{} test methods are registered, select one of: {}",
                            self.len(),
                            self.names().collect::<Vec<_>>().join(", ")
                        ),
                    )),
                }
            }
        }
    }

    fn resolve_named(&self, name: &str) -> Result<Arc<dyn TestMethod>, ExploreError> {
        if let Some(test) = self.tests.get(name) {
            return Ok(Arc::clone(test));
        }

        let suffix = format!(".{name}");
        let candidates: Vec<_> = self
            .tests
            .iter()
            .filter(|(registered, _)| registered.ends_with(&suffix))
            .collect();

        match candidates.as_slice() {
            [(_, test)] => Ok(Arc::clone(test)),
            [] => Err(ExploreError::setup(name, "no matching test method is registered")),
            many => Err(ExploreError::setup(
                name,
                format!(
                    "the name is ambiguous: {}",
                    many.iter()
                        .map(|(registered, _)| registered.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }
}

impl fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tests.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl TestMethod for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn registry(names: &[&'static str]) -> TestRegistry {
        let mut registry = TestRegistry::new();
        for name in names {
            registry.register(Arc::new(Named(name)));
        }
        registry
    }

    #[test]
    fn resolves_exact_then_suffix() {
        let registry = registry(&["Tests.Deadlock", "Tests.Race", "Deadlock"]);
        assert_eq!(registry.resolve(Some("Deadlock")).unwrap().name(), "Deadlock");
        assert_eq!(registry.resolve(Some("Race")).unwrap().name(), "Tests.Race");
    }

    #[test]
    fn ambiguous_suffix_is_a_setup_failure() {
        let registry = registry(&["A.Run", "B.Run"]);
        let err = registry.resolve(Some("Run")).unwrap_err();
        assert!(matches!(err, ExploreError::Setup { ref test, .. } if test == "Run"));
        assert!(err.to_string().contains("A.Run, B.Run"));
    }

    #[test]
    fn unnamed_requires_single_test() {
        assert_eq!(
            registry(&["Only"]).resolve(None).unwrap().name(),
            "Only"
        );
        assert!(registry(&[]).resolve(None).is_err());
        assert!(registry(&["A", "B"]).resolve(None).is_err());
    }

    #[test]
    fn unknown_name_is_a_setup_failure() {
        assert!(matches!(
            registry(&["Tests.Race"]).resolve(Some("Deadlock")),
            Err(ExploreError::Setup { .. })
        ));
    }
}
