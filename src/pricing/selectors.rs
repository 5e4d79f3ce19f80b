//! Typed price fields and selectors per supplier type.
//!
//! Each supplier type carries its own rate record and its own selector
//! vocabulary. Selection dispatches on the variant; a selector for one
//! supplier type can never read another type's fields.
//!
//! | Supplier     | Selector                          | Per person |
//! |--------------|-----------------------------------|------------|
//! | Hotel        | room type x meal plan             | no (night) |
//! | Guide        | full / half day                   | no (day)   |
//! | Vehicle      | full / half day, airport transfer | no (day)   |
//! | Tour         | adult / child                     | yes        |
//! | Entrance fee | adult / child / student           | yes        |
//! | Transfer     | per vehicle / per person          | per person |
//! | Restaurant   | lunch / dinner                    | yes        |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

use super::models::SupplierType;

/// Hotel room rates. `double` is the base room price per night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRates {
    pub double: Decimal,
    pub single_supplement: Decimal,
    #[serde(default)]
    pub triple: Option<Decimal>,
    #[serde(default)]
    pub hb_supplement: Option<Decimal>,
    #[serde(default)]
    pub fb_supplement: Option<Decimal>,
    #[serde(default)]
    pub ai_supplement: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRates {
    pub full_day: Decimal,
    #[serde(default)]
    pub half_day: Option<Decimal>,
    /// Informational; not selectable for quotation lines.
    #[serde(default)]
    pub overtime_hour: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRates {
    pub full_day: Decimal,
    #[serde(default)]
    pub half_day: Option<Decimal>,
    #[serde(default)]
    pub airport_transfer: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRates {
    pub adult: Decimal,
    #[serde(default)]
    pub child: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceFeeRates {
    pub adult: Decimal,
    #[serde(default)]
    pub child: Option<Decimal>,
    #[serde(default)]
    pub student: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRates {
    pub per_vehicle: Decimal,
    #[serde(default)]
    pub per_person: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRates {
    pub lunch: Decimal,
    #[serde(default)]
    pub dinner: Option<Decimal>,
}

/// Price fields of a record, tagged by supplier type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "supplier_type", content = "price_fields", rename_all = "snake_case")]
pub enum SupplierRates {
    Hotel(HotelRates),
    Guide(GuideRates),
    Vehicle(VehicleRates),
    Tour(TourRates),
    EntranceFee(EntranceFeeRates),
    Transfer(TransferRates),
    Restaurant(RestaurantRates),
}

impl SupplierRates {
    pub fn supplier_type(&self) -> SupplierType {
        match self {
            SupplierRates::Hotel(_) => SupplierType::Hotel,
            SupplierRates::Guide(_) => SupplierType::Guide,
            SupplierRates::Vehicle(_) => SupplierType::Vehicle,
            SupplierRates::Tour(_) => SupplierType::Tour,
            SupplierRates::EntranceFee(_) => SupplierType::EntranceFee,
            SupplierRates::Transfer(_) => SupplierType::Transfer,
            SupplierRates::Restaurant(_) => SupplierType::Restaurant,
        }
    }

    /// Parse stored price fields for a known supplier type.
    pub fn from_json(
        supplier: SupplierType,
        price_fields: serde_json::Value,
    ) -> serde_json::Result<Self> {
        Ok(match supplier {
            SupplierType::Hotel => SupplierRates::Hotel(serde_json::from_value(price_fields)?),
            SupplierType::Guide => SupplierRates::Guide(serde_json::from_value(price_fields)?),
            SupplierType::Vehicle => SupplierRates::Vehicle(serde_json::from_value(price_fields)?),
            SupplierType::Tour => SupplierRates::Tour(serde_json::from_value(price_fields)?),
            SupplierType::EntranceFee => {
                SupplierRates::EntranceFee(serde_json::from_value(price_fields)?)
            }
            SupplierType::Transfer => {
                SupplierRates::Transfer(serde_json::from_value(price_fields)?)
            }
            SupplierType::Restaurant => {
                SupplierRates::Restaurant(serde_json::from_value(price_fields)?)
            }
        })
    }

    /// Price fields as stored in the `price_fields` JSON column.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            SupplierRates::Hotel(r) => serde_json::to_value(r),
            SupplierRates::Guide(r) => serde_json::to_value(r),
            SupplierRates::Vehicle(r) => serde_json::to_value(r),
            SupplierRates::Tour(r) => serde_json::to_value(r),
            SupplierRates::EntranceFee(r) => serde_json::to_value(r),
            SupplierRates::Transfer(r) => serde_json::to_value(r),
            SupplierRates::Restaurant(r) => serde_json::to_value(r),
        }
    }

    /// Every populated price field, by name.
    pub fn fields(&self) -> Vec<(&'static str, Decimal)> {
        let mut fields = Vec::new();
        let mut push = |name: &'static str, value: Option<Decimal>| {
            if let Some(v) = value {
                fields.push((name, v));
            }
        };
        match self {
            SupplierRates::Hotel(r) => {
                push("double", Some(r.double));
                push("single_supplement", Some(r.single_supplement));
                push("triple", r.triple);
                push("hb_supplement", r.hb_supplement);
                push("fb_supplement", r.fb_supplement);
                push("ai_supplement", r.ai_supplement);
            }
            SupplierRates::Guide(r) => {
                push("full_day", Some(r.full_day));
                push("half_day", r.half_day);
                push("overtime_hour", r.overtime_hour);
            }
            SupplierRates::Vehicle(r) => {
                push("full_day", Some(r.full_day));
                push("half_day", r.half_day);
                push("airport_transfer", r.airport_transfer);
            }
            SupplierRates::Tour(r) => {
                push("adult", Some(r.adult));
                push("child", r.child);
            }
            SupplierRates::EntranceFee(r) => {
                push("adult", Some(r.adult));
                push("child", r.child);
                push("student", r.student);
            }
            SupplierRates::Transfer(r) => {
                push("per_vehicle", Some(r.per_vehicle));
                push("per_person", r.per_person);
            }
            SupplierRates::Restaurant(r) => {
                push("lunch", Some(r.lunch));
                push("dinner", r.dinner);
            }
        }
        fields
    }

    /// All price fields must be non-negative.
    pub fn validate(&self) -> Result<()> {
        let negative: Vec<&str> = self
            .fields()
            .into_iter()
            .filter(|(_, value)| value.is_sign_negative() && !value.is_zero())
            .map(|(name, _)| name)
            .collect();

        if negative.is_empty() {
            Ok(())
        } else {
            Err(PricingError::Validation(format!(
                "Price fields must be non-negative: {}",
                negative.join(", ")
            )))
        }
    }

    /// Base price the selector picks out of these rates.
    ///
    /// Returns `Ok(None)` when the record does not offer the selected variant
    /// (an optional field is absent) and `SelectorMismatch` when the selector
    /// belongs to another supplier type.
    pub fn base_price(&self, selector: &Selector) -> Result<Option<Decimal>> {
        let price = match (self, selector) {
            (SupplierRates::Hotel(r), Selector::Hotel { room, meal_plan }) => {
                let room_price = match room {
                    RoomType::Double => Some(r.double),
                    RoomType::Single => Some(add_supplement(r.double, r.single_supplement)?),
                    RoomType::Triple => r.triple,
                };
                let meal_supplement = match meal_plan {
                    MealPlan::BB => Some(Decimal::ZERO),
                    MealPlan::HB => r.hb_supplement,
                    MealPlan::FB => r.fb_supplement,
                    MealPlan::AI => r.ai_supplement,
                };
                match room_price.zip(meal_supplement) {
                    Some((room, meal)) => Some(add_supplement(room, meal)?),
                    None => None,
                }
            }
            (SupplierRates::Guide(r), Selector::Guide(day)) => match day {
                DayRate::FullDay => Some(r.full_day),
                DayRate::HalfDay => r.half_day,
            },
            (SupplierRates::Vehicle(r), Selector::Vehicle(service)) => match service {
                VehicleService::FullDay => Some(r.full_day),
                VehicleService::HalfDay => r.half_day,
                VehicleService::AirportTransfer => r.airport_transfer,
            },
            (SupplierRates::Tour(r), Selector::Tour(ticket)) => match ticket {
                TicketClass::Adult => Some(r.adult),
                TicketClass::Child => r.child,
                TicketClass::Student => None,
            },
            (SupplierRates::EntranceFee(r), Selector::EntranceFee(ticket)) => match ticket {
                TicketClass::Adult => Some(r.adult),
                TicketClass::Child => r.child,
                TicketClass::Student => r.student,
            },
            (SupplierRates::Transfer(r), Selector::Transfer(basis)) => match basis {
                TransferBasis::PerVehicle => Some(r.per_vehicle),
                TransferBasis::PerPerson => r.per_person,
            },
            (SupplierRates::Restaurant(r), Selector::Restaurant(meal)) => match meal {
                MealService::Lunch => Some(r.lunch),
                MealService::Dinner => r.dinner,
            },
            (rates, selector) => {
                return Err(PricingError::SelectorMismatch {
                    selector: selector.supplier_type(),
                    record: rates.supplier_type(),
                })
            }
        };
        Ok(price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Single,
    Double,
    Triple,
}

/// Board basis: bed & breakfast, half board, full board, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealPlan {
    BB,
    HB,
    FB,
    AI,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRate {
    FullDay,
    HalfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleService {
    FullDay,
    HalfDay,
    AirportTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketClass {
    Adult,
    Child,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferBasis {
    PerVehicle,
    PerPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealService {
    Lunch,
    Dinner,
}

/// Which price of a record applies to a quotation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "service_type", content = "selector", rename_all = "snake_case")]
pub enum Selector {
    Hotel { room: RoomType, meal_plan: MealPlan },
    Guide(DayRate),
    Vehicle(VehicleService),
    Tour(TicketClass),
    EntranceFee(TicketClass),
    Transfer(TransferBasis),
    Restaurant(MealService),
}

impl Selector {
    pub fn supplier_type(&self) -> SupplierType {
        match self {
            Selector::Hotel { .. } => SupplierType::Hotel,
            Selector::Guide(_) => SupplierType::Guide,
            Selector::Vehicle(_) => SupplierType::Vehicle,
            Selector::Tour(_) => SupplierType::Tour,
            Selector::EntranceFee(_) => SupplierType::EntranceFee,
            Selector::Transfer(_) => SupplierType::Transfer,
            Selector::Restaurant(_) => SupplierType::Restaurant,
        }
    }

    /// Per-person selectors are multiplied by quantity when resolved.
    /// Night and day rates leave quantity to the caller.
    pub fn is_per_person(&self) -> bool {
        match self {
            Selector::Hotel { .. } | Selector::Guide(_) | Selector::Vehicle(_) => false,
            Selector::Transfer(basis) => *basis == TransferBasis::PerPerson,
            Selector::Tour(_) | Selector::EntranceFee(_) | Selector::Restaurant(_) => true,
        }
    }

    /// Stable textual key, e.g. `hotel:single:HB` or `entrance_fee:child`.
    pub fn key(&self) -> String {
        let variant = match self {
            Selector::Hotel { room, meal_plan } => {
                let room = match room {
                    RoomType::Single => "single",
                    RoomType::Double => "double",
                    RoomType::Triple => "triple",
                };
                let meal = match meal_plan {
                    MealPlan::BB => "BB",
                    MealPlan::HB => "HB",
                    MealPlan::FB => "FB",
                    MealPlan::AI => "AI",
                };
                format!("{}:{}", room, meal)
            }
            Selector::Guide(DayRate::FullDay) => "full_day".to_string(),
            Selector::Guide(DayRate::HalfDay) => "half_day".to_string(),
            Selector::Vehicle(VehicleService::FullDay) => "full_day".to_string(),
            Selector::Vehicle(VehicleService::HalfDay) => "half_day".to_string(),
            Selector::Vehicle(VehicleService::AirportTransfer) => "airport_transfer".to_string(),
            Selector::Tour(ticket) | Selector::EntranceFee(ticket) => match ticket {
                TicketClass::Adult => "adult".to_string(),
                TicketClass::Child => "child".to_string(),
                TicketClass::Student => "student".to_string(),
            },
            Selector::Transfer(TransferBasis::PerVehicle) => "per_vehicle".to_string(),
            Selector::Transfer(TransferBasis::PerPerson) => "per_person".to_string(),
            Selector::Restaurant(MealService::Lunch) => "lunch".to_string(),
            Selector::Restaurant(MealService::Dinner) => "dinner".to_string(),
        };
        format!("{}:{}", self.supplier_type(), variant)
    }
}

fn add_supplement(price: Decimal, supplement: Decimal) -> Result<Decimal> {
    price
        .checked_add(supplement)
        .ok_or_else(|| PricingError::Validation("Hotel supplement overflowed".to_string()))
}
