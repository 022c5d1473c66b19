//! Particle species codes.

/// Particle species assigned by classification.
///
/// Discriminants are the magnitudes of the PDG Monte Carlo codes; the
/// beam monitor cannot tell charge sign, so `-13` and `13` both map to
/// [`ParticleCode::Muon`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ParticleCode {
    #[default]
    Unknown = 0,
    Electron = 11,
    Muon = 13,
    Pion = 211,
}

impl ParticleCode {
    /// Identified species, in classification priority order.
    pub const SPECIES: [ParticleCode; 3] = [Self::Electron, Self::Muon, Self::Pion];

    /// Returns the numeric (unsigned PDG) code.
    #[inline]
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Maps a signed PDG code to a species; unsupported codes give `None`.
    #[must_use]
    pub fn from_pdg(pdg: i32) -> Option<Self> {
        match pdg.unsigned_abs() {
            0 => Some(Self::Unknown),
            11 => Some(Self::Electron),
            13 => Some(Self::Muon),
            211 => Some(Self::Pion),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Electron => "electron",
            Self::Muon => "muon",
            Self::Pion => "pion",
        }
    }

    #[must_use]
    pub fn is_identified(self) -> bool {
        self != Self::Unknown
    }
}

impl std::fmt::Display for ParticleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ParticleCode::Unknown.code(), 0);
        assert_eq!(ParticleCode::Electron.code(), 11);
        assert_eq!(ParticleCode::Muon.code(), 13);
        assert_eq!(ParticleCode::Pion.code(), 211);
    }

    #[test]
    fn test_from_pdg_is_sign_agnostic() {
        assert_eq!(ParticleCode::from_pdg(-11), Some(ParticleCode::Electron));
        assert_eq!(ParticleCode::from_pdg(-211), Some(ParticleCode::Pion));
        assert_eq!(ParticleCode::from_pdg(2212), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ParticleCode::Muon.to_string(), "muon");
        assert!(!ParticleCode::Unknown.is_identified());
    }
}
