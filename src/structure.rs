//! Anatomical structures addressed by brain models and parcels.
//!
//! The CIFTI name of a structure is its upper case identifier prefixed
//! with `CIFTI_STRUCTURE_`, e.g. `CIFTI_STRUCTURE_CORTEX_LEFT`.

use std::fmt;

const CIFTI_PREFIX: &str = "CIFTI_STRUCTURE_";

macro_rules! structures {
    ($($(#[$meta:meta])* $variant:ident = $code:expr, $name:expr, $gui:expr;)+) => {
        /// Anatomical structure of a surface or volume model.
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, FromPrimitive)]
        pub enum Structure {
            $(
                $(#[$meta])*
                #[doc = concat!("`", "CIFTI_STRUCTURE_", $name, "`")]
                $variant = $code,
            )+
        }

        impl Structure {
            /// All known structures, in declaration order.
            pub const ALL_STRUCTURES: &'static [Structure] = &[$(Structure::$variant,)+];

            /// The identifier of this structure without the CIFTI prefix.
            pub fn name(self) -> &'static str {
                match self {
                    $(Structure::$variant => $name,)+
                }
            }

            /// A human readable name for display.
            pub fn gui_name(self) -> &'static str {
                match self {
                    $(Structure::$variant => $gui,)+
                }
            }
        }
    };
}

structures! {
    /// Left cerebral cortex
    CortexLeft = 0, "CORTEX_LEFT", "CortexLeft";
    /// Right cerebral cortex
    CortexRight = 1, "CORTEX_RIGHT", "CortexRight";
    /// Cerebellum
    Cerebellum = 2, "CEREBELLUM", "Cerebellum";
    AccumbensLeft = 3, "ACCUMBENS_LEFT", "AccumbensLeft";
    AccumbensRight = 4, "ACCUMBENS_RIGHT", "AccumbensRight";
    All = 5, "ALL", "All";
    AllGreyMatter = 6, "ALL_GREY_MATTER", "AllGreyMatter";
    AllWhiteMatter = 7, "ALL_WHITE_MATTER", "AllWhiteMatter";
    AmygdalaLeft = 8, "AMYGDALA_LEFT", "AmygdalaLeft";
    AmygdalaRight = 9, "AMYGDALA_RIGHT", "AmygdalaRight";
    BrainStem = 10, "BRAIN_STEM", "BrainStem";
    CaudateLeft = 11, "CAUDATE_LEFT", "CaudateLeft";
    CaudateRight = 12, "CAUDATE_RIGHT", "CaudateRight";
    CerebellarWhiteMatterLeft = 13, "CEREBELLAR_WHITE_MATTER_LEFT", "CerebellarWhiteMatterLeft";
    CerebellarWhiteMatterRight = 14, "CEREBELLAR_WHITE_MATTER_RIGHT", "CerebellarWhiteMatterRight";
    CerebellumLeft = 15, "CEREBELLUM_LEFT", "CerebellumLeft";
    CerebellumRight = 16, "CEREBELLUM_RIGHT", "CerebellumRight";
    CerebralWhiteMatterLeft = 17, "CEREBRAL_WHITE_MATTER_LEFT", "CerebralWhiteMatterLeft";
    CerebralWhiteMatterRight = 18, "CEREBRAL_WHITE_MATTER_RIGHT", "CerebralWhiteMatterRight";
    Cortex = 19, "CORTEX", "Cortex";
    DiencephalonVentralLeft = 20, "DIENCEPHALON_VENTRAL_LEFT", "DiencephalonVentralLeft";
    DiencephalonVentralRight = 21, "DIENCEPHALON_VENTRAL_RIGHT", "DiencephalonVentralRight";
    HippocampusLeft = 22, "HIPPOCAMPUS_LEFT", "HippocampusLeft";
    HippocampusRight = 23, "HIPPOCAMPUS_RIGHT", "HippocampusRight";
    /// Placeholder for an unknown structure
    Invalid = 24, "INVALID", "Invalid";
    Other = 25, "OTHER", "Other";
    OtherGreyMatter = 26, "OTHER_GREY_MATTER", "OtherGreyMatter";
    OtherWhiteMatter = 27, "OTHER_WHITE_MATTER", "OtherWhiteMatter";
    PallidumLeft = 28, "PALLIDUM_LEFT", "PallidumLeft";
    PallidumRight = 29, "PALLIDUM_RIGHT", "PallidumRight";
    PutamenLeft = 30, "PUTAMEN_LEFT", "PutamenLeft";
    PutamenRight = 31, "PUTAMEN_RIGHT", "PutamenRight";
    ThalamusLeft = 32, "THALAMUS_LEFT", "ThalamusLeft";
    ThalamusRight = 33, "THALAMUS_RIGHT", "ThalamusRight";
}

impl Structure {
    /// The name used in CIFTI XML, such as `CIFTI_STRUCTURE_CORTEX_LEFT`.
    pub fn to_cifti_name(self) -> String {
        format!("{}{}", CIFTI_PREFIX, self.name())
    }

    /// Parse a CIFTI structure name. Returns `None` for anything that is
    /// not a known `CIFTI_STRUCTURE_*` name.
    pub fn from_cifti_name(name: &str) -> Option<Structure> {
        let stripped = name.strip_prefix(CIFTI_PREFIX)?;
        Self::from_name(stripped)
    }

    /// Parse a structure identifier without the CIFTI prefix.
    pub fn from_name(name: &str) -> Option<Structure> {
        Self::ALL_STRUCTURES
            .iter()
            .copied()
            .find(|s| s.name() == name)
    }

    /// Parse a display name, as returned by `gui_name`.
    pub fn from_gui_name(name: &str) -> Option<Structure> {
        Self::ALL_STRUCTURES
            .iter()
            .copied()
            .find(|s| s.gui_name() == name)
    }

    /// Whether the structure belongs to the left hemisphere.
    pub fn is_left(self) -> bool {
        self.name().ends_with("_LEFT")
    }

    /// Whether the structure belongs to the right hemisphere.
    pub fn is_right(self) -> bool {
        self.name().ends_with("_RIGHT")
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Structure;
    use num_traits::FromPrimitive;

    #[test]
    fn cifti_names() {
        assert_eq!(
            Structure::CortexLeft.to_cifti_name(),
            "CIFTI_STRUCTURE_CORTEX_LEFT"
        );
        assert_eq!(
            Structure::from_cifti_name("CIFTI_STRUCTURE_THALAMUS_RIGHT"),
            Some(Structure::ThalamusRight)
        );
        assert_eq!(Structure::from_cifti_name("CORTEX_LEFT"), None);
        assert_eq!(Structure::from_cifti_name("CIFTI_STRUCTURE_NOPE"), None);
        for s in Structure::ALL_STRUCTURES {
            assert_eq!(Structure::from_cifti_name(&s.to_cifti_name()), Some(*s));
            assert_eq!(Structure::from_gui_name(s.gui_name()), Some(*s));
        }
    }

    #[test]
    fn codes_and_sides() {
        assert_eq!(Structure::from_i32(0), Some(Structure::CortexLeft));
        assert_eq!(Structure::from_i32(33), Some(Structure::ThalamusRight));
        assert_eq!(Structure::from_i32(34), None);
        assert!(Structure::CaudateLeft.is_left());
        assert!(!Structure::CaudateLeft.is_right());
        assert!(!Structure::BrainStem.is_left());
        assert!(!Structure::BrainStem.is_right());
    }
}
