use std::fmt;
use clap::ValueEnum;

/// Reference genome build passed to Sarek through the `REFERENCE` placeholder
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Genome {
    #[value(name = "GRCh37")]
    GRCh37,
    #[value(name = "GRCh38")]
    GRCh38,
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Genome::GRCh37 => write!(f, "GRCh37"),
            Genome::GRCh38 => write!(f, "GRCh38"),
        }
    }
}

/// Sex column of the Sarek input TSV
///
/// `ZZ` means unknown and is what germline runs use when no sex is given.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum SexTag {
    #[value(name = "XX")]
    XX,
    #[value(name = "XY")]
    XY,
    #[default]
    #[value(name = "ZZ")]
    ZZ,
}

impl fmt::Display for SexTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SexTag::XX => write!(f, "XX"),
            SexTag::XY => write!(f, "XY"),
            SexTag::ZZ => write!(f, "ZZ"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genome_displays_build_name() {
        assert_eq!(Genome::GRCh38.to_string(), "GRCh38");
        assert_eq!(Genome::from_str("GRCh37", false), Ok(Genome::GRCh37));
    }

    #[test]
    fn sex_defaults_to_unknown() {
        assert_eq!(SexTag::default().to_string(), "ZZ");
    }
}
