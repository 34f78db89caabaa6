//! The categories of electricity source by which every table is disaggregated.
use serde_string_enum::{DeserializeStringEnum, SerializeStringEnum};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A fuel or technology type.
///
/// The declaration order is the canonical column order used in reports and digests.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    SerializeStringEnum,
    DeserializeStringEnum,
)]
#[strum(ascii_case_insensitive)]
pub enum Source {
    /// Coal-fired plants
    Coal,
    /// Gas-fired plants
    Gas,
    /// Oil- and diesel-fired plants
    Oil,
    /// Large and intermediate hydro
    BigHydro,
    /// Small hydro
    SmallHydro,
    /// Biomass-fired plants
    Biomass,
    /// Wind turbines
    Wind,
    /// Solar photovoltaics
    Solar,
    /// Coal-fired plants with carbon capture
    CoalCCS,
    /// Gas-fired plants with carbon capture
    GasCCS,
    /// Biomass-fired plants with carbon capture
    BioCCS,
    /// Net imports of electricity
    Import,
    /// Pumped-storage hydro (capacity bookkeeping only)
    PumpedStorage,
}

/// The role a [`Source`] plays in the accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Domestic generation: has capacity, production, costs and emissions
    Generation,
    /// Net imports: production only, taken from the plan's import series
    Import,
    /// Storage: capacity only, never counted in production (it would be double counting)
    Storage,
}

impl Source {
    /// The role this source plays in the accounts
    pub fn kind(self) -> SourceKind {
        match self {
            Self::Import => SourceKind::Import,
            Self::PumpedStorage => SourceKind::Storage,
            _ => SourceKind::Generation,
        }
    }

    /// Whether this is a domestic generation category
    pub fn is_fuel(self) -> bool {
        self.kind() == SourceKind::Generation
    }

    /// Whether this source produces electricity (domestic generation or imports)
    pub fn is_source(self) -> bool {
        self.kind() != SourceKind::Storage
    }

    /// Whether this source has installed capacity
    pub fn has_capacity(self) -> bool {
        self.kind() != SourceKind::Import
    }

    /// Whether this is a carbon capture technology
    pub fn is_ccs(self) -> bool {
        matches!(self, Self::CoalCCS | Self::GasCCS | Self::BioCCS)
    }

    /// Whether this source burns fuel (so has a heat rate and heat price)
    pub fn is_combustion(self) -> bool {
        matches!(self, Self::Coal | Self::Gas | Self::Oil | Self::Biomass) || self.is_ccs()
    }
}

/// The domestic generation categories
pub fn fuels() -> impl Iterator<Item = Source> + Clone {
    Source::iter().filter(|s| s.is_fuel())
}

/// The categories which contribute to production: domestic generation plus imports
pub fn sources() -> impl Iterator<Item = Source> + Clone {
    Source::iter().filter(|s| s.is_source())
}

/// The categories which have installed capacity: domestic generation plus storage
pub fn capacity_sources() -> impl Iterator<Item = Source> + Clone {
    Source::iter().filter(|s| s.has_capacity())
}

/// Every category, including storage
pub fn technologies() -> impl Iterator<Item = Source> + Clone {
    Source::iter()
}

/// The carbon capture technologies
pub fn ccs() -> impl Iterator<Item = Source> + Clone {
    Source::iter().filter(|s| s.is_ccs())
}
