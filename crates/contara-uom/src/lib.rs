use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The five unit-of-measure families. Conversion is only defined within a
/// family; the canonical units are UN, KG, L, M and M2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitFamily {
    Count,
    Weight,
    Volume,
    Length,
    Area,
}

impl UnitFamily {
    pub fn canonical(self) -> Unit {
        match self {
            UnitFamily::Count => Unit::Un,
            UnitFamily::Weight => Unit::Kg,
            UnitFamily::Volume => Unit::L,
            UnitFamily::Length => Unit::M,
            UnitFamily::Area => Unit::M2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    // Count
    Un,
    Dz,
    Pkg,
    Box,
    Pr,
    Roll,
    // Weight
    Mg,
    G,
    Kg,
    Lb,
    // Volume
    Ml,
    L,
    M3,
    Cm3,
    OzFl,
    Gal,
    // Length
    Mm,
    Cm,
    M,
    Km,
    In,
    Ft,
    Yd,
    // Area
    Cm2,
    M2,
    In2,
    Ft2,
    Yd2,
}

impl Unit {
    pub const ALL: [Unit; 28] = [
        Unit::Un,
        Unit::Dz,
        Unit::Pkg,
        Unit::Box,
        Unit::Pr,
        Unit::Roll,
        Unit::Mg,
        Unit::G,
        Unit::Kg,
        Unit::Lb,
        Unit::Ml,
        Unit::L,
        Unit::M3,
        Unit::Cm3,
        Unit::OzFl,
        Unit::Gal,
        Unit::Mm,
        Unit::Cm,
        Unit::M,
        Unit::Km,
        Unit::In,
        Unit::Ft,
        Unit::Yd,
        Unit::Cm2,
        Unit::M2,
        Unit::In2,
        Unit::Ft2,
        Unit::Yd2,
    ];

    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Un | Unit::Dz | Unit::Pkg | Unit::Box | Unit::Pr | Unit::Roll => {
                UnitFamily::Count
            }
            Unit::Mg | Unit::G | Unit::Kg | Unit::Lb => UnitFamily::Weight,
            Unit::Ml | Unit::L | Unit::M3 | Unit::Cm3 | Unit::OzFl | Unit::Gal => {
                UnitFamily::Volume
            }
            Unit::Mm | Unit::Cm | Unit::M | Unit::Km | Unit::In | Unit::Ft | Unit::Yd => {
                UnitFamily::Length
            }
            Unit::Cm2 | Unit::M2 | Unit::In2 | Unit::Ft2 | Unit::Yd2 => UnitFamily::Area,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Un => "UN",
            Unit::Dz => "DZ",
            Unit::Pkg => "PKG",
            Unit::Box => "BOX",
            Unit::Pr => "PR",
            Unit::Roll => "ROLL",
            Unit::Mg => "MG",
            Unit::G => "G",
            Unit::Kg => "KG",
            Unit::Lb => "LB",
            Unit::Ml => "ML",
            Unit::L => "L",
            Unit::M3 => "M3",
            Unit::Cm3 => "CM3",
            Unit::OzFl => "OZ_FL",
            Unit::Gal => "GAL",
            Unit::Mm => "MM",
            Unit::Cm => "CM",
            Unit::M => "M",
            Unit::Km => "KM",
            Unit::In => "IN",
            Unit::Ft => "FT",
            Unit::Yd => "YD",
            Unit::Cm2 => "CM2",
            Unit::M2 => "M2",
            Unit::In2 => "IN2",
            Unit::Ft2 => "FT2",
            Unit::Yd2 => "YD2",
        }
    }

    /// Fixed factor from this unit to its family's canonical unit. PKG, BOX
    /// and ROLL default to 1 here; per-item pack sizes override them through
    /// [`Converter`].
    fn fixed_factor(self) -> Decimal {
        match self {
            Unit::Un | Unit::Pkg | Unit::Box | Unit::Roll => Decimal::ONE,
            Unit::Dz => Decimal::from(12),
            Unit::Pr => Decimal::from(2),
            Unit::Mg => Decimal::new(1, 6),
            Unit::G => Decimal::new(1, 3),
            Unit::Kg => Decimal::ONE,
            Unit::Lb => Decimal::new(45_359_237, 8),
            Unit::Ml => Decimal::new(1, 3),
            Unit::L => Decimal::ONE,
            Unit::M3 => Decimal::from(1000),
            Unit::Cm3 => Decimal::new(1, 3),
            Unit::OzFl => Decimal::new(295_735_295_625, 13),
            Unit::Gal => Decimal::new(3_785_411_784, 9),
            Unit::Mm => Decimal::new(1, 3),
            Unit::Cm => Decimal::new(1, 2),
            Unit::M => Decimal::ONE,
            Unit::Km => Decimal::from(1000),
            Unit::In => Decimal::new(254, 4),
            Unit::Ft => Decimal::new(3048, 4),
            Unit::Yd => Decimal::new(9144, 4),
            Unit::Cm2 => Decimal::new(1, 4),
            Unit::M2 => Decimal::ONE,
            Unit::In2 => Decimal::new(64_516, 8),
            Unit::Ft2 => Decimal::new(9_290_304, 8),
            Unit::Yd2 => Decimal::new(83_612_736, 8),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown unit code: {0}")]
pub struct UnknownUnit(pub String);

impl FromStr for Unit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| UnknownUnit(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UomError {
    #[error("incompatible units: {from} and {to} are in different families")]
    IncompatibleUnits { from: Unit, to: Unit },
    #[error("conversion factor for {unit} resolved to zero")]
    ZeroFactor { unit: Unit },
}

/// Units-per-pack for the three count units whose size is not a physical
/// constant. One package of screws may be 24 UN for one item and 500 UN for
/// another, so these ride on the item rather than on the unit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSizes {
    pub per_package: Decimal,
    pub per_box: Decimal,
    pub per_roll: Decimal,
}

impl Default for PackSizes {
    fn default() -> Self {
        Self {
            per_package: Decimal::ONE,
            per_box: Decimal::ONE,
            per_roll: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    packs: PackSizes,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packs(packs: PackSizes) -> Self {
        Self { packs }
    }

    pub fn factor(&self, unit: Unit) -> Decimal {
        match unit {
            Unit::Pkg => self.packs.per_package,
            Unit::Box => self.packs.per_box,
            Unit::Roll => self.packs.per_roll,
            other => other.fixed_factor(),
        }
    }

    pub fn to_canonical(&self, qty: Decimal, unit: Unit) -> Decimal {
        qty * self.factor(unit)
    }

    /// Convert a quantity between two units of the same family. The identity
    /// case short-circuits so repeated conversions cannot accumulate error.
    pub fn convert(&self, qty: Decimal, from: Unit, to: Unit) -> Result<Decimal, UomError> {
        if from == to {
            return Ok(qty);
        }
        if from.family() != to.family() {
            return Err(UomError::IncompatibleUnits { from, to });
        }
        let denominator = self.factor(to);
        if denominator.is_zero() {
            return Err(UomError::ZeroFactor { unit: to });
        }
        Ok(qty * self.factor(from) / denominator)
    }

    /// Convert a unit price between two units of the same family. A price is
    /// per-unit, so it scales by the inverse of the quantity ratio: a price
    /// per kilogram divides by 1000 to become a price per gram.
    pub fn convert_unit_price(
        &self,
        price: Decimal,
        from: Unit,
        to: Unit,
    ) -> Result<Decimal, UomError> {
        if from == to {
            return Ok(price);
        }
        if from.family() != to.family() {
            return Err(UomError::IncompatibleUnits { from, to });
        }
        let denominator = self.factor(from);
        if denominator.is_zero() {
            return Err(UomError::ZeroFactor { unit: from });
        }
        Ok(round_money(price * self.factor(to) / denominator))
    }
}

/// Monetary rounding: two decimal places, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn quantity_conversion_within_family() {
        let conv = Converter::new();
        assert_eq!(conv.convert(dec("2.5"), Unit::Kg, Unit::G).unwrap(), dec("2500"));
        assert_eq!(conv.convert(dec("3"), Unit::Dz, Unit::Un).unwrap(), dec("36"));
        assert_eq!(conv.convert(dec("1500"), Unit::Ml, Unit::L).unwrap(), dec("1.5"));
        assert_eq!(conv.convert(dec("2"), Unit::M, Unit::Cm).unwrap(), dec("200"));
    }

    #[test]
    fn identity_conversion_returns_input_untouched() {
        let conv = Converter::new();
        let qty = dec("0.3333333333333333333333333333");
        assert_eq!(conv.convert(qty, Unit::Lb, Unit::Lb).unwrap(), qty);
    }

    #[test]
    fn cross_family_conversion_is_rejected() {
        let conv = Converter::new();
        let err = conv.convert(dec("5"), Unit::Kg, Unit::L).unwrap_err();
        assert_eq!(
            err,
            UomError::IncompatibleUnits {
                from: Unit::Kg,
                to: Unit::L
            }
        );
    }

    #[test]
    fn price_conversion_is_the_inverse_of_quantity_conversion() {
        let conv = Converter::new();
        // 2000 per KG is 2.00 per G, while 1 KG is 1000 G. The two
        // conversions must not be accidentally symmetric.
        assert_eq!(
            conv.convert_unit_price(dec("2000"), Unit::Kg, Unit::G).unwrap(),
            dec("2.00")
        );
        assert_eq!(conv.convert(dec("1"), Unit::Kg, Unit::G).unwrap(), dec("1000"));
        assert_eq!(
            conv.convert_unit_price(dec("0.5"), Unit::G, Unit::Kg).unwrap(),
            dec("500")
        );
    }

    #[test]
    fn pack_sizes_override_count_factors() {
        let conv = Converter::with_packs(PackSizes {
            per_package: dec("24"),
            per_box: dec("144"),
            per_roll: Decimal::ONE,
        });
        assert_eq!(conv.convert(dec("2"), Unit::Pkg, Unit::Un).unwrap(), dec("48"));
        assert_eq!(conv.convert(dec("1"), Unit::Box, Unit::Dz).unwrap(), dec("12"));
        assert_eq!(
            conv.convert_unit_price(dec("48"), Unit::Pkg, Unit::Un).unwrap(),
            dec("2.00")
        );
    }

    #[test]
    fn zero_pack_factor_is_an_error_not_a_zero_quantity() {
        let conv = Converter::with_packs(PackSizes {
            per_package: Decimal::ZERO,
            per_box: Decimal::ONE,
            per_roll: Decimal::ONE,
        });
        assert_eq!(
            conv.convert(dec("5"), Unit::Un, Unit::Pkg).unwrap_err(),
            UomError::ZeroFactor { unit: Unit::Pkg }
        );
        assert_eq!(
            conv.convert_unit_price(dec("5"), Unit::Pkg, Unit::Un).unwrap_err(),
            UomError::ZeroFactor { unit: Unit::Pkg }
        );
    }

    #[test]
    fn to_canonical_multiplies_by_the_fixed_factor() {
        let conv = Converter::new();
        assert_eq!(conv.to_canonical(dec("2"), Unit::Lb), dec("0.90718474"));
        assert_eq!(conv.to_canonical(dec("3"), Unit::M3), dec("3000"));
    }

    #[test]
    fn round_money_is_half_away_from_zero() {
        assert_eq!(round_money(dec("2.005")), dec("2.01"));
        assert_eq!(round_money(dec("-2.005")), dec("-2.01"));
        assert_eq!(round_money(dec("2.004")), dec("2.00"));
        assert_eq!(round_money(dec("19.999")), dec("20.00"));
    }

    #[test]
    fn unit_codes_round_trip_through_from_str() {
        for unit in Unit::ALL {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
        assert!("KGS".parse::<Unit>().is_err());
    }

    #[test]
    fn every_family_canonical_unit_has_factor_one() {
        let conv = Converter::new();
        for family in [
            UnitFamily::Count,
            UnitFamily::Weight,
            UnitFamily::Volume,
            UnitFamily::Length,
            UnitFamily::Area,
        ] {
            assert_eq!(conv.factor(family.canonical()), Decimal::ONE);
        }
    }

    const FAMILIES: [&[Unit]; 5] = [
        &[Unit::Un, Unit::Dz, Unit::Pkg, Unit::Box, Unit::Pr, Unit::Roll],
        &[Unit::Mg, Unit::G, Unit::Kg, Unit::Lb],
        &[Unit::Ml, Unit::L, Unit::M3, Unit::Cm3, Unit::OzFl, Unit::Gal],
        &[Unit::Mm, Unit::Cm, Unit::M, Unit::Km, Unit::In, Unit::Ft, Unit::Yd],
        &[Unit::Cm2, Unit::M2, Unit::In2, Unit::Ft2, Unit::Yd2],
    ];

    proptest! {
        #[test]
        fn conversion_round_trips_within_tolerance(
            family_ix in 0usize..5,
            from_ix in 0usize..7,
            to_ix in 0usize..7,
            millis in 0u64..1_000_000_000,
        ) {
            let family = FAMILIES[family_ix];
            let from = family[from_ix % family.len()];
            let to = family[to_ix % family.len()];
            let qty = Decimal::new(millis as i64, 3);

            let conv = Converter::new();
            let there = conv.convert(qty, from, to).unwrap();
            let back = conv.convert(there, to, from).unwrap();

            let tolerance = Decimal::new(1, 9);
            prop_assert!((back - qty).abs() <= tolerance, "{qty} {from}->{to}->{from} gave {back}");
        }
    }
}
