mod common;
mod disclosure;
mod permissions;

pub use common::{FieldDescriptorResponse, HealthDependencyStatus, HealthResponse};
pub use disclosure::{
    CreateDisclosureRequestRequest, DisclosureRequestResponse, RespondToDisclosureRequestRequest,
};
pub use permissions::{
    EffectivePermissionsResponse, PermissionGrantResponse, SharedProfileResponse,
};

#[cfg(test)]
mod tests {
    use super::{
        CreateDisclosureRequestRequest, DisclosureRequestResponse, EffectivePermissionsResponse,
        FieldDescriptorResponse, HealthDependencyStatus, HealthResponse, PermissionGrantResponse,
        RespondToDisclosureRequestRequest, SharedProfileResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        CreateDisclosureRequestRequest::export(&config)?;
        RespondToDisclosureRequestRequest::export(&config)?;
        DisclosureRequestResponse::export(&config)?;
        PermissionGrantResponse::export(&config)?;
        EffectivePermissionsResponse::export(&config)?;
        SharedProfileResponse::export(&config)?;
        FieldDescriptorResponse::export(&config)?;
        HealthDependencyStatus::export(&config)?;
        HealthResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }
}
