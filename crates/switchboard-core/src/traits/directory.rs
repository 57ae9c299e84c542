// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant directory resolving channel identifiers to tenants.

use crate::error::SwitchboardError;
use crate::types::Tenant;

/// Resolves phone-number identifiers to the single tenant that owns them.
///
/// Credentials returned for a tenant must only ever be used for that tenant.
pub trait TenantDirectory: Send + Sync + 'static {
    /// Looks up a tenant by company id.
    fn by_company(&self, company_id: &str) -> Result<Tenant, SwitchboardError>;

    /// Looks up the tenant owning a WhatsApp Business phone number id.
    fn by_whatsapp_phone_number_id(&self, phone_number_id: &str)
        -> Result<Tenant, SwitchboardError>;

    /// Looks up the tenant owning an SMS number.
    ///
    /// With no receiving number, the single SMS-enabled tenant is returned;
    /// more than one is a validation error.
    fn by_sms_number(&self, to: Option<&str>) -> Result<Tenant, SwitchboardError>;
}
