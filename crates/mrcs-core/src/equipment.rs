//! Equipment addressing
//!
//! Every piece of equipment on the layout is addressed by a coordinate of
//! `(type, sector, serial)`:
//! - `EquipmentIdentifier` - a definite address, used as a message source
//! - `EquipmentFilter` - a partial address where any field may be `*`,
//!   used for subscriptions, targets and queries
//!
//! Both render as `TYPE.SSS.NNN`, with numbers zero-padded to three digits
//! and `*` for a wildcard field.
//!
//! Equality and ordering only exist between values of the same kind. A
//! wildcard is a value in its own right for those purposes and sorts before
//! every concrete value of its field. Only [`EquipmentSpec::matches`] treats
//! a wildcard as "anything".

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The token that stands for "any value" in a coordinate field
pub const WILDCARD: &str = "*";

/// Largest sector or serial number; numbers render as exactly three digits
pub const MAX_NUMBER: u16 = 999;

/// The category of a piece of equipment
///
/// Variants are declared in the lexical order of their tokens, so the derived
/// ordering agrees with the ordering of the rendered strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentType {
    #[serde(rename = "BOS")]
    BlockOccupancySensor,
    #[serde(rename = "CTL")]
    ControlRouter,
    #[serde(rename = "DCP")]
    Decoupler,
    #[serde(rename = "LCR")]
    LevelCrossing,
    #[serde(rename = "LDS")]
    LidarSensor,
    #[serde(rename = "LTG")]
    LightingGroup,
    #[serde(rename = "MLG")]
    MessageLogger,
    #[serde(rename = "MPU")]
    MotivePowerUnit,
    #[serde(rename = "PNT")]
    Point,
    #[serde(rename = "SCH")]
    ScheduleController,
    #[serde(rename = "SIG")]
    Signal,
    /// A train, which may be multi-headed
    #[serde(rename = "TRN")]
    Train,
    #[serde(rename = "TST")]
    TestEquipment,
    #[serde(rename = "VIS")]
    VisionSensor,
}

impl EquipmentType {
    /// Every equipment type, in order
    pub const ALL: [EquipmentType; 14] = [
        EquipmentType::BlockOccupancySensor,
        EquipmentType::ControlRouter,
        EquipmentType::Decoupler,
        EquipmentType::LevelCrossing,
        EquipmentType::LidarSensor,
        EquipmentType::LightingGroup,
        EquipmentType::MessageLogger,
        EquipmentType::MotivePowerUnit,
        EquipmentType::Point,
        EquipmentType::ScheduleController,
        EquipmentType::Signal,
        EquipmentType::Train,
        EquipmentType::TestEquipment,
        EquipmentType::VisionSensor,
    ];

    /// The three-letter token used on the wire
    pub fn token(&self) -> &'static str {
        match self {
            EquipmentType::BlockOccupancySensor => "BOS",
            EquipmentType::ControlRouter => "CTL",
            EquipmentType::Decoupler => "DCP",
            EquipmentType::LevelCrossing => "LCR",
            EquipmentType::LidarSensor => "LDS",
            EquipmentType::LightingGroup => "LTG",
            EquipmentType::MessageLogger => "MLG",
            EquipmentType::MotivePowerUnit => "MPU",
            EquipmentType::Point => "PNT",
            EquipmentType::ScheduleController => "SCH",
            EquipmentType::Signal => "SIG",
            EquipmentType::Train => "TRN",
            EquipmentType::TestEquipment => "TST",
            EquipmentType::VisionSensor => "VIS",
        }
    }
}

impl FromStr for EquipmentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EquipmentType::ALL
            .iter()
            .copied()
            .find(|t| t.token() == s)
            .ok_or_else(|| Error::UnknownType(s.to_string()))
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Read access to the three coordinate fields, with `None` meaning wildcard
pub trait EquipmentSpec {
    fn equipment_type(&self) -> Option<EquipmentType>;
    fn sector(&self) -> Option<u16>;
    fn serial(&self) -> Option<u16>;

    /// Check this coordinate against a filter
    ///
    /// A wildcard in `pattern` accepts anything. A concrete field in
    /// `pattern` only accepts the same concrete value; a wildcard in `self`
    /// never satisfies it.
    fn matches(&self, pattern: &EquipmentFilter) -> bool {
        field_matches(self.equipment_type(), pattern.equipment_type)
            && field_matches(self.sector(), pattern.sector)
            && field_matches(self.serial(), pattern.serial)
    }
}

fn field_matches<T: PartialEq>(value: Option<T>, pattern: Option<T>) -> bool {
    match pattern {
        None => true,
        Some(p) => value == Some(p),
    }
}

fn parse_type_token(token: &str) -> Result<Option<EquipmentType>> {
    if token == WILDCARD {
        return Ok(None);
    }
    token.parse().map(Some)
}

fn parse_number_token(token: &str, field: &str) -> Result<Option<u16>> {
    if token == WILDCARD {
        return Ok(None);
    }
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Format(format!("{} token {:?}", field, token)));
    }
    let out_of_range = || Error::Format(format!("{} token {:?} out of range", field, token));
    let n: u16 = token.parse().map_err(|_| out_of_range())?;
    if n > MAX_NUMBER {
        return Err(out_of_range());
    }
    Ok(Some(n))
}

fn check_number(value: Option<u16>, field: &str) -> Result<()> {
    match value {
        Some(n) if n > MAX_NUMBER => Err(Error::Format(format!(
            "{} {} out of range 0..={}",
            field, n, MAX_NUMBER
        ))),
        _ => Ok(()),
    }
}

fn split_tokens(s: &str) -> Result<[&str; 3]> {
    let mut pieces = s.split('.');
    match (pieces.next(), pieces.next(), pieces.next(), pieces.next()) {
        (Some(t), Some(sector), Some(serial), None) => Ok([t, sector, serial]),
        _ => Err(Error::Format(format!("expected TYPE.SECTOR.SERIAL, got {:?}", s))),
    }
}

fn write_coordinate(
    f: &mut fmt::Formatter<'_>,
    equipment_type: Option<EquipmentType>,
    sector: Option<u16>,
    serial: Option<u16>,
) -> fmt::Result {
    match equipment_type {
        Some(t) => write!(f, "{}.", t)?,
        None => write!(f, "{}.", WILDCARD)?,
    }
    match sector {
        Some(n) => write!(f, "{:03}.", n)?,
        None => write!(f, "{}.", WILDCARD)?,
    }
    match serial {
        Some(n) => write!(f, "{:03}", n),
        None => f.write_str(WILDCARD),
    }
}

/// A definite equipment address, for use by publishers
///
/// Type and serial are always concrete. The sector may be "any sector" for
/// equipment that is not sector-scoped, e.g. `SCH.*.001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EquipmentIdentifier {
    equipment_type: EquipmentType,
    sector: Option<u16>,
    serial: u16,
}

impl EquipmentIdentifier {
    /// Create a new identifier
    ///
    /// Fails with `Format` if a number does not fit in three digits.
    pub fn new(equipment_type: EquipmentType, sector: Option<u16>, serial: u16) -> Result<Self> {
        check_number(sector, "sector")?;
        check_number(Some(serial), "serial")?;
        Ok(Self {
            equipment_type,
            sector,
            serial,
        })
    }

    /// The first unit of a type that is not sector-scoped, `<TYPE>.*.001`
    pub const fn unscoped(equipment_type: EquipmentType) -> Self {
        Self {
            equipment_type,
            sector: None,
            serial: 1,
        }
    }

    /// Build from the three wire tokens
    ///
    /// Fails with `InvalidState` if the type or serial token is a wildcard.
    pub fn from_tokens(type_token: &str, sector_token: &str, serial_token: &str) -> Result<Self> {
        let filter = EquipmentFilter::from_tokens(type_token, sector_token, serial_token)?;
        Self::try_from(filter)
    }

    pub fn kind(&self) -> EquipmentType {
        self.equipment_type
    }

    pub fn sector_number(&self) -> Option<u16> {
        self.sector
    }

    pub fn serial_number(&self) -> u16 {
        self.serial
    }
}

impl EquipmentSpec for EquipmentIdentifier {
    fn equipment_type(&self) -> Option<EquipmentType> {
        Some(self.equipment_type)
    }

    fn sector(&self) -> Option<u16> {
        self.sector
    }

    fn serial(&self) -> Option<u16> {
        Some(self.serial)
    }
}

impl FromStr for EquipmentIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let [t, sector, serial] = split_tokens(s)?;
        Self::from_tokens(t, sector, serial)
    }
}

impl TryFrom<String> for EquipmentIdentifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EquipmentIdentifier> for String {
    fn from(id: EquipmentIdentifier) -> Self {
        id.to_string()
    }
}

impl TryFrom<EquipmentFilter> for EquipmentIdentifier {
    type Error = Error;

    fn try_from(filter: EquipmentFilter) -> Result<Self> {
        match (filter.equipment_type, filter.serial) {
            (Some(equipment_type), Some(serial)) => Ok(Self {
                equipment_type,
                sector: filter.sector,
                serial,
            }),
            _ => Err(Error::InvalidState(format!(
                "identifier may not have a wildcard type or serial: {}",
                filter
            ))),
        }
    }
}

impl fmt::Display for EquipmentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(f, Some(self.equipment_type), self.sector, Some(self.serial))
    }
}

/// A partial equipment address, for use by subscribers and as a message target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct EquipmentFilter {
    equipment_type: Option<EquipmentType>,
    sector: Option<u16>,
    serial: Option<u16>,
}

impl EquipmentFilter {
    /// Create a new filter; `None` fields are wildcards
    ///
    /// Fails with `Format` if a number does not fit in three digits.
    pub fn new(
        equipment_type: Option<EquipmentType>,
        sector: Option<u16>,
        serial: Option<u16>,
    ) -> Result<Self> {
        check_number(sector, "sector")?;
        check_number(serial, "serial")?;
        Ok(Self {
            equipment_type,
            sector,
            serial,
        })
    }

    /// The filter that matches every piece of equipment (`*.*.*`)
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from the three wire tokens
    pub fn from_tokens(type_token: &str, sector_token: &str, serial_token: &str) -> Result<Self> {
        Ok(Self {
            equipment_type: parse_type_token(type_token)?,
            sector: parse_number_token(sector_token, "sector")?,
            serial: parse_number_token(serial_token, "serial")?,
        })
    }

    /// True if no field is a wildcard
    pub fn is_concrete(&self) -> bool {
        self.equipment_type.is_some() && self.sector.is_some() && self.serial.is_some()
    }
}

impl EquipmentSpec for EquipmentFilter {
    fn equipment_type(&self) -> Option<EquipmentType> {
        self.equipment_type
    }

    fn sector(&self) -> Option<u16> {
        self.sector
    }

    fn serial(&self) -> Option<u16> {
        self.serial
    }
}

impl From<EquipmentIdentifier> for EquipmentFilter {
    fn from(id: EquipmentIdentifier) -> Self {
        Self {
            equipment_type: Some(id.equipment_type),
            sector: id.sector,
            serial: Some(id.serial),
        }
    }
}

impl FromStr for EquipmentFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let [t, sector, serial] = split_tokens(s)?;
        Self::from_tokens(t, sector, serial)
    }
}

impl TryFrom<String> for EquipmentFilter {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EquipmentFilter> for String {
    fn from(filter: EquipmentFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for EquipmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(f, self.equipment_type, self.sector, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filter(s: &str) -> EquipmentFilter {
        s.parse().unwrap()
    }

    #[test]
    fn test_identifier_display() {
        let id = EquipmentIdentifier::new(EquipmentType::Signal, Some(1), 2).unwrap();
        assert_eq!(id.to_string(), "SIG.001.002");

        let id = EquipmentIdentifier::new(EquipmentType::ScheduleController, None, 1).unwrap();
        assert_eq!(id.to_string(), "SCH.*.001");
    }

    #[test]
    fn test_filter_parse_pads_numbers() {
        let f = filter("SIG.01.*");
        assert_eq!(f.equipment_type(), Some(EquipmentType::Signal));
        assert_eq!(f.sector(), Some(1));
        assert_eq!(f.serial(), None);
        assert_eq!(f.to_string(), "SIG.001.*");
    }

    #[test]
    fn test_filter_matches_identifier() {
        let id = EquipmentIdentifier::new(EquipmentType::MotivePowerUnit, Some(3), 7).unwrap();
        assert!(id.matches(&filter("MPU.*.*")));
        assert!(id.matches(&filter("MPU.003.007")));
        assert!(!id.matches(&filter("MPU.004.*")));
        assert!(!id.matches(&filter("SIG.*.*")));
    }

    #[test]
    fn test_wildcard_does_not_match_concrete_pattern() {
        let any_sector = EquipmentIdentifier::new(EquipmentType::ScheduleController, None, 1).unwrap();
        assert!(!any_sector.matches(&filter("SCH.001.001")));
        assert!(any_sector.matches(&filter("SCH.*.001")));
        assert!(!EquipmentFilter::all().matches(&filter("SIG.*.*")));
    }

    #[test]
    fn test_everything_matches_all() {
        for t in EquipmentType::ALL {
            let id = EquipmentIdentifier::new(t, Some(12), 345).unwrap();
            assert!(id.matches(&EquipmentFilter::all()));
        }
        assert!(filter("*.*.*").matches(&EquipmentFilter::all()));
    }

    #[test]
    fn test_wildcard_sorts_first() {
        assert!(filter("SIG.001.*") < filter("SIG.001.001"));
        assert!(filter("*.999.999") < filter("BOS.*.*"));
        assert!(filter("SIG.002.*") > filter("SIG.001.*"));

        let any_sector = EquipmentIdentifier::new(EquipmentType::Signal, None, 9).unwrap();
        let sector_one = EquipmentIdentifier::new(EquipmentType::Signal, Some(1), 1).unwrap();
        assert!(any_sector < sector_one);
    }

    #[test]
    fn test_wildcard_is_not_equal_to_value() {
        assert_ne!(filter("SIG.*.001"), filter("SIG.001.001"));
        assert_eq!(filter("SIG.*.001"), filter("SIG.*.1"));
    }

    #[test]
    fn test_type_order_follows_tokens() {
        let tokens: Vec<&str> = EquipmentType::ALL.iter().map(|t| t.token()).collect();
        let mut sorted = tokens.clone();
        sorted.sort();
        assert_eq!(tokens, sorted);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "SBO.001.*".parse::<EquipmentFilter>(),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            "SIG.x1.*".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            "SIG.-1.*".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            "SIG.001".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            "SIG.001.002.003".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            "SIG.001.70000".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_numbers_limited_to_three_digits() {
        assert!(matches!(
            "SIG.001.1000".parse::<EquipmentIdentifier>(),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            "SIG.1000.*".parse::<EquipmentFilter>(),
            Err(Error::Format(_))
        ));
        assert_eq!(filter("SIG.0999.*").to_string(), "SIG.999.*");

        assert!(matches!(
            EquipmentIdentifier::new(EquipmentType::Signal, Some(1), 1000),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            EquipmentFilter::new(None, Some(1000), None),
            Err(Error::Format(_))
        ));
        let top = EquipmentIdentifier::new(EquipmentType::Signal, Some(999), 999).unwrap();
        assert_eq!(top.to_string(), "SIG.999.999");
    }

    #[test]
    fn test_unscoped_identifier() {
        let id = EquipmentIdentifier::unscoped(EquipmentType::MessageLogger);
        assert_eq!(id.to_string(), "MLG.*.001");
    }

    #[test]
    fn test_identifier_rejects_wildcards() {
        assert!(matches!(
            "*.001.002".parse::<EquipmentIdentifier>(),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            "SIG.001.*".parse::<EquipmentIdentifier>(),
            Err(Error::InvalidState(_))
        ));
        let id: EquipmentIdentifier = "SIG.*.002".parse().unwrap();
        assert_eq!(id.sector_number(), None);
    }

    #[test]
    fn test_filter_identifier_conversion() {
        let id = EquipmentIdentifier::new(EquipmentType::Point, Some(4), 12).unwrap();
        let f = EquipmentFilter::from(id);
        assert!(f.is_concrete());
        assert_eq!(EquipmentIdentifier::try_from(f).unwrap(), id);
    }

    #[test]
    fn test_serde_as_string() {
        let id = EquipmentIdentifier::new(EquipmentType::TestEquipment, Some(1), 2).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"TST.001.002\"");
        let back: EquipmentIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<EquipmentIdentifier>("\"TST.*.*\"").is_err());
    }

    fn filter_strategy() -> impl Strategy<Value = EquipmentFilter> {
        (
            prop::option::of(prop::sample::select(EquipmentType::ALL.to_vec())),
            prop::option::of(0u16..1000),
            prop::option::of(0u16..1000),
        )
            .prop_map(|(t, sector, serial)| EquipmentFilter::new(t, sector, serial).unwrap())
    }

    fn identifier_strategy() -> impl Strategy<Value = EquipmentIdentifier> {
        (
            prop::sample::select(EquipmentType::ALL.to_vec()),
            prop::option::of(0u16..=MAX_NUMBER),
            0u16..=MAX_NUMBER,
        )
            .prop_map(|(t, sector, serial)| EquipmentIdentifier::new(t, sector, serial).unwrap())
    }

    proptest! {
        #[test]
        fn prop_identifier_display_parses_back(id in identifier_strategy()) {
            let s = id.to_string();
            for token in s.split('.').skip(1) {
                prop_assert!(token == WILDCARD || token.len() == 3);
            }
            prop_assert_eq!(s.parse::<EquipmentIdentifier>().unwrap(), id);
        }

        #[test]
        fn prop_order_is_total(a in filter_strategy(), b in filter_strategy()) {
            let outcomes = [a < b, a == b, b < a];
            prop_assert_eq!(outcomes.iter().filter(|o| **o).count(), 1);
        }

        #[test]
        fn prop_order_is_transitive(
            a in filter_strategy(),
            b in filter_strategy(),
            c in filter_strategy(),
        ) {
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }

        #[test]
        fn prop_display_parses_back(f in filter_strategy()) {
            prop_assert_eq!(f.to_string().parse::<EquipmentFilter>().unwrap(), f);
        }

        #[test]
        fn prop_concrete_matches_itself(f in filter_strategy()) {
            prop_assert!(f.matches(&f));
        }
    }
}
