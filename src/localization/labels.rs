//! Marker label set (Plug-in-Gait style).
//!
//! Bilateral markers are stored without their side letter; [`sided`] builds
//! the full label (`"L"`/`"R"` prefix).

use crate::skeleton::Side;

// Pelvis
pub const LASI: &str = "LASI";
pub const RASI: &str = "RASI";
pub const LPSI: &str = "LPSI";
pub const RPSI: &str = "RPSI";

// Trunk
pub const C7: &str = "C7";
pub const T10: &str = "T10";
pub const CLAV: &str = "CLAV";
pub const STRN: &str = "STRN";

// Head
pub const LFHD: &str = "LFHD";
pub const RFHD: &str = "RFHD";
pub const LBHD: &str = "LBHD";
pub const RBHD: &str = "RBHD";

// Arm (bilateral)
pub const SHO: &str = "SHO";
pub const UPA: &str = "UPA";
pub const ELB: &str = "ELB";
pub const ELM: &str = "ELM";
pub const FRM: &str = "FRM";
pub const WRA: &str = "WRA";
pub const WRB: &str = "WRB";
pub const FIN: &str = "FIN";
pub const THM: &str = "THM";
pub const IDX: &str = "IDX";

// Leg (bilateral)
pub const THI: &str = "THI";
pub const KNE: &str = "KNE";
pub const KNM: &str = "KNM";
pub const TIB: &str = "TIB";
pub const ANK: &str = "ANK";
pub const MED: &str = "MED";
pub const HEE: &str = "HEE";
pub const TOE: &str = "TOE";

/// Full label of a bilateral marker, e.g. `sided(Side::Left, KNE) == "LKNE"`.
pub fn sided(side: Side, base: &str) -> String {
    format!("{}{}", side.prefix(), base)
}
