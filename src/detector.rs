use crate::{
    diagnostics::Diagnostics, markers::MarkerLookup, BackendDescriptor, DetectionPredicate,
    REGISTRY,
};

/// Inspects the environment for installed backends.
///
/// A backend counts as present only if both markers of one of its
/// detection predicates are present. A lone engine or a lone bridge is
/// reported and counts as absent.
pub(crate) struct Detector<'a> {
    pub(crate) markers: &'a dyn MarkerLookup,
    pub(crate) diagnostics: &'a Diagnostics,
}

impl Detector<'_> {
    // The present backends, in registry order.
    pub(crate) fn detect(&self) -> Vec<&'static BackendDescriptor> {
        REGISTRY
            .iter()
            .filter(|descriptor| self.is_present(descriptor))
            .collect()
    }

    pub(crate) fn is_present(&self, descriptor: &BackendDescriptor) -> bool {
        descriptor
            .detection_predicates
            .iter()
            .any(|predicate| self.is_satisfied(descriptor, predicate))
    }

    // Lookup failures count as absence.
    pub(crate) fn has_marker(&self, marker: &str) -> bool {
        match self.markers.lookup(marker) {
            Ok(present) => present,
            Err(e) => {
                self.diagnostics
                    .log_logging(format_args!("marker lookup for {marker} failed: {e}"));
                false
            }
        }
    }

    fn is_satisfied(&self, descriptor: &BackendDescriptor, predicate: &DetectionPredicate) -> bool {
        let has_engine = self.has_marker(predicate.engine);
        let has_bridge = if predicate.bridge == predicate.engine {
            has_engine
        } else {
            self.has_marker(predicate.bridge)
        };
        match (has_engine, has_bridge) {
            (true, true) => true,
            (false, false) => false,
            (false, true) => {
                self.diagnostics.log_always(format_args!(
                    "Environment has the {} bridge but not {}",
                    predicate.bridge, descriptor.display_name
                ));
                false
            }
            (true, false) => {
                self.diagnostics.log_always(format_args!(
                    "Environment has {} but not the {} bridge",
                    descriptor.display_name, predicate.bridge
                ));
                false
            }
        }
    }
}
