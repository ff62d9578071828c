//! Bristol Stool Scale glossary.
//!
//! The immutable reference table for the 7-point scale, used both for
//! validation bounds and for human-readable output.

use crate::types::BristolType;

/// Glossary entry for one scale classification
#[derive(Clone, Copy, Debug)]
pub struct ScaleEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub status: &'static str,
}

/// The scale, indexed by type number minus one
static SCALE: [ScaleEntry; 7] = [
    ScaleEntry {
        name: "Type 1",
        description: "Separate hard lumps",
        status: "Constipated",
    },
    ScaleEntry {
        name: "Type 2",
        description: "Lumpy sausage",
        status: "Slightly constipated",
    },
    ScaleEntry {
        name: "Type 3",
        description: "Sausage with cracks",
        status: "Normal",
    },
    ScaleEntry {
        name: "Type 4",
        description: "Smooth sausage",
        status: "Ideal!",
    },
    ScaleEntry {
        name: "Type 5",
        description: "Soft blobs",
        status: "Lacking fiber",
    },
    ScaleEntry {
        name: "Type 6",
        description: "Mushy consistency",
        status: "Mild diarrhea",
    },
    ScaleEntry {
        name: "Type 7",
        description: "Liquid",
        status: "Diarrhea",
    },
];

/// Look up the glossary entry for a classification.
///
/// Total for every `BristolType` since construction is range-checked.
pub fn scale_entry(t: BristolType) -> &'static ScaleEntry {
    &SCALE[(t.value() - 1) as usize]
}

/// Validate the glossary for completeness.
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate() -> Vec<String> {
    let mut errors = Vec::new();

    for (idx, entry) in SCALE.iter().enumerate() {
        if entry.name.is_empty() {
            errors.push(format!("Scale entry {} has empty name", idx + 1));
        }
        if entry.description.is_empty() {
            errors.push(format!("Scale entry {} has empty description", idx + 1));
        }
        if entry.status.is_empty() {
            errors.push(format!("Scale entry {} has empty status", idx + 1));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_an_entry() {
        for v in 1..=7 {
            let t = BristolType::new(v).unwrap();
            let entry = scale_entry(t);
            assert!(!entry.description.is_empty());
        }
    }

    #[test]
    fn test_known_entries() {
        let ideal = scale_entry(BristolType::new(4).unwrap());
        assert_eq!(ideal.description, "Smooth sausage");
        assert_eq!(ideal.status, "Ideal!");

        let liquid = scale_entry(BristolType::new(7).unwrap());
        assert_eq!(liquid.description, "Liquid");
    }

    #[test]
    fn test_glossary_validates() {
        let errors = validate();
        assert!(errors.is_empty(), "Glossary has errors: {:?}", errors);
    }
}
