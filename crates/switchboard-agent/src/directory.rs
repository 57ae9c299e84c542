// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config-backed tenant directory.

use std::collections::HashMap;

use switchboard_config::model::TenantConfig;
use switchboard_core::SwitchboardError;
use switchboard_core::TenantDirectory;
use switchboard_core::types::{Tenant, normalize_phone_number};

/// Resolves tenants from the `[[tenants]]` config array.
///
/// Uniqueness of company ids and channel credentials is checked by config
/// validation, so each index maps to exactly one tenant.
#[derive(Debug, Default)]
pub struct ConfigDirectory {
    tenants: Vec<Tenant>,
    by_company: HashMap<String, usize>,
    by_phone_number_id: HashMap<String, usize>,
    by_sms_number: HashMap<String, usize>,
}

impl ConfigDirectory {
    pub fn new(tenants: Vec<Tenant>) -> Self {
        let mut directory = Self::default();
        for (i, tenant) in tenants.iter().enumerate() {
            directory.by_company.insert(tenant.company_id.clone(), i);
            if let Some(wa) = &tenant.whatsapp {
                directory
                    .by_phone_number_id
                    .insert(wa.phone_number_id.clone(), i);
            }
            if let Some(sms) = &tenant.sms {
                directory
                    .by_sms_number
                    .insert(normalize_phone_number(&sms.from_number), i);
            }
        }
        directory.tenants = tenants;
        directory
    }

    pub fn from_config(tenants: &[TenantConfig]) -> Self {
        Self::new(tenants.iter().map(TenantConfig::to_tenant).collect())
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    fn tenant_not_found(id: &str) -> SwitchboardError {
        SwitchboardError::NotFound {
            entity: "tenant",
            id: id.to_string(),
        }
    }
}

impl TenantDirectory for ConfigDirectory {
    fn by_company(&self, company_id: &str) -> Result<Tenant, SwitchboardError> {
        self.by_company
            .get(company_id)
            .map(|&i| self.tenants[i].clone())
            .ok_or_else(|| Self::tenant_not_found(company_id))
    }

    fn by_whatsapp_phone_number_id(
        &self,
        phone_number_id: &str,
    ) -> Result<Tenant, SwitchboardError> {
        self.by_phone_number_id
            .get(phone_number_id)
            .map(|&i| self.tenants[i].clone())
            .ok_or_else(|| Self::tenant_not_found(phone_number_id))
    }

    fn by_sms_number(&self, to: Option<&str>) -> Result<Tenant, SwitchboardError> {
        if let Some(to) = to {
            return self
                .by_sms_number
                .get(&normalize_phone_number(to))
                .map(|&i| self.tenants[i].clone())
                .ok_or_else(|| Self::tenant_not_found(to));
        }

        let mut sms_tenants = self.tenants.iter().filter(|t| t.sms.is_some());
        match (sms_tenants.next(), sms_tenants.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => Err(Self::tenant_not_found("sms")),
            (Some(_), Some(_)) => Err(SwitchboardError::Validation(
                "inbound SMS has no receiving number and several tenants use SMS".into(),
            )),
        }
    }
}
