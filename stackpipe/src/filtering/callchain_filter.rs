//! Callchain filtering and reordering

use stackpipe_common::{FilterSettings, CUT_MARKER};

use super::classifier::{ExternalClassifier, FrameClassifier, RuleClassifier, RuleMode};
use super::rules::RuleSet;
use crate::domain::FilterError;
use crate::symbolization::ResolvedFrame;

/// A frame surviving the filter, or the marker standing in for a run of
/// rejected frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilteredFrame {
    Kept(ResolvedFrame),
    Cut,
}

impl FilteredFrame {
    /// `(display name, module path)` dictionary key
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        match self {
            FilteredFrame::Kept(frame) => (&frame.name, &frame.module),
            FilteredFrame::Cut => (CUT_MARKER, ""),
        }
    }

    /// Offset written next to the dictionary code; empty for the cut marker
    #[must_use]
    pub fn offset(&self) -> &str {
        match self {
            FilteredFrame::Kept(frame) => &frame.offset,
            FilteredFrame::Cut => "",
        }
    }
}

/// Unfiltered path: every frame kept, outermost first.
#[must_use]
pub fn passthrough(chain: Vec<ResolvedFrame>) -> Vec<FilteredFrame> {
    chain.into_iter().rev().map(FilteredFrame::Kept).collect()
}

/// Filter configured for the run.
pub struct CallchainFilter {
    classifier: Box<dyn FrameClassifier>,
    mark_cuts: bool,
}

impl std::fmt::Debug for CallchainFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallchainFilter").field("mark_cuts", &self.mark_cuts).finish_non_exhaustive()
    }
}

impl CallchainFilter {
    #[must_use]
    pub fn new(classifier: Box<dyn FrameClassifier>, mark_cuts: bool) -> Self {
        Self { classifier, mark_cuts }
    }

    /// Build the filter described by bootstrap settings, starting the external
    /// classifier with `python` if the settings name a script.
    ///
    /// # Errors
    /// Returns an error for invalid conditions or a script that fails to load
    pub fn from_settings(settings: &FilterSettings, python: &str) -> Result<Self, FilterError> {
        let classifier: Box<dyn FrameClassifier> = match settings {
            FilterSettings::Allow { conditions, .. } => {
                Box::new(RuleClassifier::new(RuleSet::parse(conditions)?, RuleMode::Allow))
            }
            FilterSettings::Deny { conditions, .. } => {
                Box::new(RuleClassifier::new(RuleSet::parse(conditions)?, RuleMode::Deny))
            }
            FilterSettings::Python { script, .. } => {
                Box::new(ExternalClassifier::python(python, script)?)
            }
        };

        Ok(Self::new(classifier, settings.mark()))
    }

    /// Filter `chain` (innermost first), returning the survivors outermost
    /// first.
    ///
    /// # Errors
    /// Returns an error if the classifier fails or does not return exactly one
    /// verdict per frame
    pub fn apply(&mut self, chain: Vec<ResolvedFrame>) -> Result<Vec<FilteredFrame>, FilterError> {
        let verdicts = self.classifier.classify(&chain)?;
        if verdicts.len() != chain.len() {
            return Err(FilterError::NotAList { expected: chain.len() });
        }

        let mut filtered = Vec::with_capacity(chain.len());
        let mut last_cut = false;

        for (frame, keep) in chain.into_iter().zip(verdicts) {
            if keep {
                filtered.push(FilteredFrame::Kept(frame));
                last_cut = false;
            } else if self.mark_cuts && !last_cut {
                filtered.push(FilteredFrame::Cut);
                last_cut = true;
            }
        }

        filtered.reverse();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str) -> ResolvedFrame {
        ResolvedFrame::new(name, "/bin/app", "0x0")
    }

    fn kept(name: &str) -> FilteredFrame {
        FilteredFrame::Kept(frame(name))
    }

    fn rules_filter(kind: &str, mark: bool) -> CallchainFilter {
        let conditions = vec![vec!["SYM foo".to_string()]];
        let settings = match kind {
            "allow" => FilterSettings::Allow { conditions, mark },
            _ => FilterSettings::Deny { conditions, mark },
        };
        CallchainFilter::from_settings(&settings, "python3").unwrap()
    }

    /// Classifier replaying fixed verdicts
    struct Fixed(Vec<bool>);

    impl FrameClassifier for Fixed {
        fn classify(&mut self, _chain: &[ResolvedFrame]) -> Result<Vec<bool>, FilterError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_passthrough_reverses() {
        let out = passthrough(vec![frame("inner"), frame("middle"), frame("outer")]);
        assert_eq!(out, vec![kept("outer"), kept("middle"), kept("inner")]);
    }

    #[test]
    fn test_allow_marks_cuts_around_match() {
        let mut filter = rules_filter("allow", true);

        let out = filter.apply(vec![frame("a"), frame("foo"), frame("b")]).unwrap();
        assert_eq!(out, vec![FilteredFrame::Cut, kept("foo"), FilteredFrame::Cut]);
    }

    #[test]
    fn test_allow_output_is_outermost_first() {
        let mut filter = rules_filter("allow", false);

        let out = filter.apply(vec![frame("foo_inner"), frame("x"), frame("foo_outer")]).unwrap();
        assert_eq!(out, vec![kept("foo_outer"), kept("foo_inner")]);
    }

    #[test]
    fn test_consecutive_rejections_collapse() {
        let mut filter = rules_filter("allow", true);

        let out = filter
            .apply(vec![frame("a"), frame("b"), frame("foo"), frame("c"), frame("d"), frame("e")])
            .unwrap();
        assert_eq!(out, vec![FilteredFrame::Cut, kept("foo"), FilteredFrame::Cut]);
    }

    #[test]
    fn test_without_mark_rejected_frames_vanish() {
        let mut filter = rules_filter("allow", false);

        let out = filter.apply(vec![frame("a"), frame("foo"), frame("b")]).unwrap();
        assert_eq!(out, vec![kept("foo")]);
    }

    #[test]
    fn test_deny_is_complement_of_allow() {
        let mut allow = rules_filter("allow", false);
        let mut deny = rules_filter("deny", false);
        let chain = vec![frame("a"), frame("foo"), frame("b")];

        assert_eq!(allow.apply(chain.clone()).unwrap(), vec![kept("foo")]);
        assert_eq!(deny.apply(chain).unwrap(), vec![kept("b"), kept("a")]);
    }

    #[test]
    fn test_deny_with_marks() {
        let mut deny = rules_filter("deny", true);

        let out = deny.apply(vec![frame("a"), frame("foo"), frame("b")]).unwrap();
        assert_eq!(out, vec![kept("b"), FilteredFrame::Cut, kept("a")]);
    }

    #[test]
    fn test_custom_classifier_verdicts_are_used() {
        let mut filter = CallchainFilter::new(Box::new(Fixed(vec![true, false, false])), true);

        let out = filter.apply(vec![frame("a"), frame("b"), frame("c")]).unwrap();
        assert_eq!(out, vec![FilteredFrame::Cut, kept("a")]);
    }

    #[test]
    fn test_custom_classifier_wrong_length_is_fatal() {
        let mut filter = CallchainFilter::new(Box::new(Fixed(vec![true])), true);

        let err = filter.apply(vec![frame("a"), frame("b")]).unwrap_err();
        assert!(matches!(err, FilterError::NotAList { expected: 2 }));
    }

    #[test]
    fn test_cut_marker_key() {
        assert_eq!(FilteredFrame::Cut.key(), ("(cut)", ""));
        assert_eq!(FilteredFrame::Cut.offset(), "");
        assert_eq!(kept("x").key(), ("x", "/bin/app"));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings =
            FilterSettings::Allow { conditions: vec![vec!["NAME foo".to_string()]], mark: false };
        assert!(CallchainFilter::from_settings(&settings, "python3").is_err());
    }
}
