//! This module defines the unit types used for headline figures and the scale factors used to
//! convert between the units of the input tables and the reporting units.
//!
//! Year-by-category tables are stored as plain `f64` in their reporting units (MW, GWh, MUSD,
//! TBtu, ktCO2eq). The conversion constants below are the only place where those scales are
//! related to each other.
#![allow(missing_docs)]
use serde::{Deserialize, Serialize};

/// Hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// MW of capacity running at full load for a year, expressed in GWh
pub const GWH_PER_MW_YEAR: f64 = HOURS_PER_YEAR / 1000.0;

/// MW × $/kW → MUSD
pub const MUSD_PER_MW_USD_PER_KW: f64 = 1e-3;

/// GWh × $/MWh → MUSD
pub const MUSD_PER_GWH_USD_PER_MWH: f64 = 1e-3;

/// GWh × Btu/kWh → TBtu
pub const TBTU_PER_GWH_BTU_PER_KWH: f64 = 1e-6;

/// TBtu × $/MBtu → MUSD
pub const MUSD_PER_TBTU_USD_PER_MBTU: f64 = 1.0;

/// GWh × gCO2/kWh → ktCO2
pub const KT_PER_GWH_G_PER_KWH: f64 = 1e-3;

/// ktCO2 × $/tCO2 → MUSD
pub const MUSD_PER_KT_USD_PER_T: f64 = 1e-3;

/// MUSD/GWh → USD/MWh
pub const USD_PER_MWH_PER_MUSD_PER_GWH: f64 = 1e3;

/// ktCO2 / GWh → gCO2/kWh
pub const G_PER_KWH_PER_KT_PER_GWH: f64 = 1e3;

/// MUSD/ktCO2 → USD/tCO2
pub const USD_PER_T_PER_MUSD_PER_KT: f64 = 1e3;

/// MUSD → bn USD
pub const BN_USD_PER_MUSD: f64 = 1e-3;

/// GWh → TWh
pub const TWH_PER_GWH: f64 = 1e-3;

/// kt → Mt
pub const MT_PER_KT: f64 = 1e-3;

/// kt → Gt
pub const GT_PER_KT: f64 = 1e-6;

/// Represents a dimensionless quantity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 / rhs.0)
    }
}

impl Dimensionless {
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless::from(self.0.powi(rhs))
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

impl std::fmt::Display for Dimensionless {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug, Clone, Copy, PartialEq, PartialOrd, Default, derive_more::Add, derive_more::Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is neither infinite nor NaN
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl float_cmp::ApproxEq for $name {
            type Margin = float_cmp::F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

// Base quantities (reporting scale in brackets)
unit_struct!(Money); // MUSD
unit_struct!(Energy); // GWh
unit_struct!(Emissions); // ktCO2

// Derived quantities
unit_struct!(MoneyPerEnergy); // MUSD/GWh
unit_struct!(MoneyPerEmissions); // MUSD/ktCO2
unit_struct!(EmissionsPerEnergy); // ktCO2/GWh

// Division rules
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Money, Emissions, MoneyPerEmissions);
impl_div!(Emissions, Energy, EmissionsPerEnergy);

// Multiplication rules
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(EmissionsPerEnergy, Energy, Emissions);

impl MoneyPerEnergy {
    /// The value expressed in USD/MWh
    pub fn usd_per_mwh(self) -> f64 {
        self.0 * USD_PER_MWH_PER_MUSD_PER_GWH
    }
}

impl MoneyPerEmissions {
    /// The value expressed in USD/tCO2
    pub fn usd_per_tonne(self) -> f64 {
        self.0 * USD_PER_T_PER_MUSD_PER_KT
    }
}

impl EmissionsPerEnergy {
    /// The value expressed in gCO2/kWh
    pub fn grams_per_kwh(self) -> f64 {
        self.0 * G_PER_KWH_PER_KT_PER_GWH
    }
}
