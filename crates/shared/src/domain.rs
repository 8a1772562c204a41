use std::fmt;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(CompanyId);
id_newtype!(DriverId);
id_newtype!(VehicleId);
id_newtype!(VehicleOwnerId);
id_newtype!(DepotId);
id_newtype!(RouteId);
id_newtype!(FreightOrderId);

/// A remote collection the back-office manages through the uniform
/// `/{PATH}/enabled|search|identification` endpoint family.
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: Copy + Eq + fmt::Debug + fmt::Display + From<i64> + Send + Sync + 'static;

    /// Path segment under the API base url, e.g. `vehicle-owners`.
    const PATH: &'static str;
    /// Singular human label used in notifications.
    const LABEL: &'static str;

    fn id(&self) -> Self::Id;

    /// Business identity key checked for duplicates before create.
    fn identification(&self) -> Option<&str> {
        None
    }
}

/// Enum over a string wire code. Codes outside the known set are kept
/// verbatim in `Other`, so a record read and written back is unchanged.
macro_rules! wire_code {
    ($name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn from_code(code: &str) -> Self {
                let code = code.trim();
                match code.to_ascii_lowercase().as_str() {
                    $($code => Self::$variant,)+
                    _ => Self::Other(code.to_string()),
                }
            }

            pub fn as_code(&self) -> &str {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Other(code) => code.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(code: String) -> Self {
                Self::from_code(&code)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(code) => code,
                    known => known.as_code().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_code())
            }
        }
    };
}

wire_code!(IdentificationType {
    Dni => "dni",
    Ruc => "ruc",
    Passport => "passport",
    ForeignerCard => "foreigner_card",
});

impl IdentificationType {
    /// National registry numbers are digits only; travel documents are not.
    pub fn requires_numeric_value(&self) -> bool {
        matches!(self, Self::Dni | Self::Ruc)
    }
}

impl Default for IdentificationType {
    fn default() -> Self {
        Self::Dni
    }
}

wire_code!(FreightStatus {
    Pending => "pending",
    Assigned => "assigned",
    InTransit => "in_transit",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl Default for FreightStatus {
    fn default() -> Self {
        Self::Pending
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub identification_type: IdentificationType,
    pub identification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub identification_type: IdentificationType,
    pub identification: String,
    pub license_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleOwner {
    pub id: VehicleOwnerId,
    pub name: String,
    #[serde(default)]
    pub identification_type: IdentificationType,
    pub identification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate: String,
    pub brand: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub vehicle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<VehicleOwnerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depot {
    pub id: DepotId,
    pub code: String,
    pub name: String,
    pub depot_type: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    pub code: String,
    pub origin: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightOrder {
    pub id: FreightOrderId,
    pub code: String,
    pub company_id: CompanyId,
    pub route_id: RouteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
    pub weight_kg: f64,
    #[serde(default)]
    pub status: FreightStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

macro_rules! resource {
    ($ty:ty, $id:ty, $path:literal, $label:literal, |$this:ident| $ident:expr) => {
        impl Resource for $ty {
            type Id = $id;

            const PATH: &'static str = $path;
            const LABEL: &'static str = $label;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn identification(&self) -> Option<&str> {
                let $this = self;
                Some(AsRef::<str>::as_ref($ident))
            }
        }
    };
}

resource!(Company, CompanyId, "companies", "company", |c| &c.identification);
resource!(Driver, DriverId, "drivers", "driver", |d| &d.identification);
resource!(Vehicle, VehicleId, "vehicles", "vehicle", |v| &v.plate);
resource!(
    VehicleOwner,
    VehicleOwnerId,
    "vehicle-owners",
    "vehicle owner",
    |o| &o.identification
);
resource!(Depot, DepotId, "depots", "depot", |d| &d.code);
resource!(Route, RouteId, "routes", "route", |r| &r.code);
resource!(
    FreightOrder,
    FreightOrderId,
    "freight-orders",
    "freight order",
    |f| &f.code
);

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
