//! Per-entity screen configuration. Every screen is the same orchestrator;
//! only the data here differs.

use std::{sync::Arc, time::Duration};

use shared::domain::{Company, Depot, Driver, FreightOrder, Resource, Route, Vehicle, VehicleOwner};

use crate::{
    form::{FieldSpec, FormSpec, Rule},
    store::{DeletePolicy, ResourceStore},
    Backoffice,
};

pub const QUICK_SEARCH_DEBOUNCE: Duration = Duration::from_millis(800);
pub const SLOW_SEARCH_DEBOUNCE: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub title: &'static str,
    pub form: FormSpec,
    pub search_debounce: Duration,
    pub delete_policy: DeletePolicy,
    /// Field whose value is checked with the identification lookup.
    pub lookup_field: Option<&'static str>,
}

pub trait Catalogued: Resource {
    fn screen_config() -> ScreenConfig;

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>>;
}

fn identification_fields(form: FormSpec) -> FormSpec {
    form.field(
        FieldSpec::text("identificationType")
            .default_value("dni")
            .required()
            .identity(),
    )
    .field(
        FieldSpec::text("identification")
            .required()
            .identity()
            .rule(Rule::MaxLength(20))
            .rule(Rule::Identification {
                type_field: "identificationType",
            }),
    )
    .reset_on_change("identificationType", "identification")
}

fn contact_fields(form: FormSpec) -> FormSpec {
    form.field(FieldSpec::text("email").rule(Rule::Email).rule(Rule::MaxLength(120)))
        .field(
            FieldSpec::text("phone")
                .rule(Rule::Numeric)
                .rule(Rule::MinLength(6))
                .rule(Rule::MaxLength(15)),
        )
}

impl Catalogued for Company {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new().field(
            FieldSpec::text("name")
                .required()
                .rule(Rule::MinLength(2))
                .rule(Rule::MaxLength(120)),
        );
        let form = contact_fields(identification_fields(form))
            .field(FieldSpec::text("address").rule(Rule::MaxLength(200)));
        ScreenConfig {
            title: "Companies",
            form,
            search_debounce: QUICK_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::RemoveLocally,
            lookup_field: Some("identification"),
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.companies
    }
}

impl Catalogued for Driver {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new()
            .field(FieldSpec::text("firstName").required().rule(Rule::MaxLength(80)))
            .field(FieldSpec::text("lastName").required().rule(Rule::MaxLength(80)));
        let form = contact_fields(identification_fields(form))
            .field(
                FieldSpec::text("licenseNumber")
                    .required()
                    .identity()
                    .rule(Rule::MinLength(5))
                    .rule(Rule::MaxLength(20)),
            )
            .field(FieldSpec::text("licenseCategory").rule(Rule::MaxLength(10)))
            .field(FieldSpec::integer("companyId"));
        ScreenConfig {
            title: "Drivers",
            form,
            search_debounce: QUICK_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::Refetch,
            lookup_field: Some("identification"),
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.drivers
    }
}

impl Catalogued for VehicleOwner {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new().field(
            FieldSpec::text("name")
                .required()
                .rule(Rule::MinLength(2))
                .rule(Rule::MaxLength(120)),
        );
        ScreenConfig {
            title: "Vehicle owners",
            form: contact_fields(identification_fields(form)),
            search_debounce: QUICK_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::RemoveLocally,
            lookup_field: Some("identification"),
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.vehicle_owners
    }
}

impl Catalogued for Vehicle {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new()
            .field(
                FieldSpec::text("plate")
                    .required()
                    .identity()
                    .rule(Rule::MinLength(6))
                    .rule(Rule::MaxLength(10)),
            )
            .field(FieldSpec::text("brand").required().rule(Rule::MaxLength(60)))
            .field(FieldSpec::text("model").required().rule(Rule::MaxLength(60)))
            .field(FieldSpec::integer("year"))
            .field(FieldSpec::text("vehicleType").required())
            .field(FieldSpec::decimal("capacityKg"))
            .field(FieldSpec::integer("companyId").required())
            .field(FieldSpec::integer("ownerId").required())
            .field(FieldSpec::integer("driverId"));
        ScreenConfig {
            title: "Vehicles",
            form,
            search_debounce: SLOW_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::Refetch,
            lookup_field: Some("plate"),
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.vehicles
    }
}

impl Catalogued for Depot {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new()
            .field(
                FieldSpec::text("code")
                    .required()
                    .identity()
                    .rule(Rule::MaxLength(20)),
            )
            .field(FieldSpec::text("name").required().rule(Rule::MaxLength(120)))
            .field(FieldSpec::text("depotType").required())
            .field(FieldSpec::text("address").required().rule(Rule::MaxLength(200)))
            .field(FieldSpec::text("city").rule(Rule::MaxLength(80)))
            .field(FieldSpec::integer("capacity"));
        ScreenConfig {
            title: "Depots",
            form,
            search_debounce: QUICK_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::RemoveLocally,
            lookup_field: None,
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.depots
    }
}

impl Catalogued for Route {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new()
            .field(
                FieldSpec::text("code")
                    .required()
                    .identity()
                    .rule(Rule::MaxLength(20)),
            )
            .field(FieldSpec::text("origin").required().rule(Rule::MaxLength(120)))
            .field(FieldSpec::text("destination").required().rule(Rule::MaxLength(120)))
            .field(FieldSpec::decimal("distanceKm"))
            .field(FieldSpec::decimal("estimatedHours"));
        ScreenConfig {
            title: "Routes",
            form,
            search_debounce: QUICK_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::Refetch,
            lookup_field: None,
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.routes
    }
}

impl Catalogued for FreightOrder {
    fn screen_config() -> ScreenConfig {
        let form = FormSpec::new()
            .field(
                FieldSpec::text("code")
                    .required()
                    .identity()
                    .rule(Rule::MaxLength(30)),
            )
            .field(FieldSpec::integer("companyId").required())
            .field(FieldSpec::integer("routeId").required())
            .field(FieldSpec::integer("vehicleId"))
            .field(FieldSpec::integer("driverId"))
            .field(FieldSpec::decimal("weightKg").required())
            .field(FieldSpec::text("status").default_value("pending").required())
            .field(FieldSpec::text("pickupDate"))
            .field(FieldSpec::text("notes").rule(Rule::MaxLength(500)));
        ScreenConfig {
            title: "Freight orders",
            form,
            search_debounce: SLOW_SEARCH_DEBOUNCE,
            delete_policy: DeletePolicy::Refetch,
            lookup_field: None,
        }
    }

    fn store(backoffice: &Backoffice) -> &Arc<ResourceStore<Self>> {
        &backoffice.freight_orders
    }
}
