//! Property-based tests for cap diffing and validation using proptest.
//!
//! Properties verified:
//! - Blank desired caps never count as a change
//! - Any differing non-blank desired cap counts as a change
//! - Merging never drops a granted cap
//! - Validation accepts exactly the fully specified records

use ceph_client_reconciler::{
    CapabilitySet, ClientIdentity, ClientRecord, Subsystem, ValidationError, changed, validate,
};
use proptest::prelude::*;

/// A cap string or blank, drawn from a small alphabet so collisions happen.
fn cap() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("allow *".to_string()),
        Just("allow r".to_string()),
        Just("allow rwx pool=test".to_string()),
        "profile [a-z]{1,8}",
    ]
}

fn caps() -> impl Strategy<Value = CapabilitySet> {
    (cap(), cap(), cap()).prop_map(|(osd, mon, mds)| CapabilitySet::new(osd, mon, mds))
}

// ==========================================================================
// PROPERTY: changed
// ==========================================================================

proptest! {
    /// Property: `changed` is false exactly when every non-blank desired
    /// cap equals the observed cap.
    #[test]
    fn prop_changed_matches_field_comparison(old in caps(), new in caps()) {
        let differs = Subsystem::ALL.into_iter().any(|subsystem| {
            let desired = new.get(subsystem);
            !desired.is_empty() && desired != old.get(subsystem)
        });
        prop_assert_eq!(changed(&old, &new), differs);
    }

    /// Property: blanking fields of an unchanged desired set never makes it changed.
    #[test]
    fn prop_blank_fields_never_change(old in caps(), mask in any::<[bool; 3]>()) {
        let [osd, mon, mds] = mask;
        let new = CapabilitySet::new(
            if osd { old.osd.clone() } else { String::new() },
            if mon { old.mon.clone() } else { String::new() },
            if mds { old.mds.clone() } else { String::new() },
        );
        prop_assert!(!changed(&old, &new));
    }

    /// Property: nothing needs changing after the merged caps are applied.
    #[test]
    fn prop_merge_converges(old in caps(), new in caps()) {
        let applied = new.merged_over(&old);
        prop_assert!(!changed(&applied, &new));
        for subsystem in Subsystem::ALL {
            if !old.get(subsystem).is_empty() {
                prop_assert!(!applied.get(subsystem).is_empty());
            }
        }
    }
}

// ==========================================================================
// PROPERTY: validate
// ==========================================================================

proptest! {
    /// Property: named records validate iff all three caps are set.
    #[test]
    fn prop_validate_requires_complete_caps(caps in caps()) {
        let record = ClientRecord::new(ClientIdentity::new("client1", "myns"), caps.clone());
        let expected = match caps.configured_count() {
            0 => Err(ValidationError::NoCapabilities),
            3 => Ok(()),
            _ => Err(ValidationError::IncompleteCapabilities),
        };
        prop_assert_eq!(validate(&record), expected);
    }

    /// Property: missing identity parts are reported whatever the caps.
    #[test]
    fn prop_validate_requires_identity(caps in caps()) {
        let unnamed = ClientRecord::new(ClientIdentity::new("", "myns"), caps.clone());
        prop_assert_eq!(validate(&unnamed), Err(ValidationError::MissingName));

        let homeless = ClientRecord::new(ClientIdentity::new("client1", ""), caps);
        prop_assert_eq!(validate(&homeless), Err(ValidationError::MissingNamespace));
    }
}

#[test]
fn test_reference_examples() {
    let old = CapabilitySet::uniform("allow *");
    assert!(!changed(&old, &CapabilitySet::new("", "allow *", "allow *")));
    assert!(changed(&old, &CapabilitySet::uniform("allow rwx pool=test")));
}
