// src/profile/validate.rs
use super::{ConnectionDescriptor, ProfileError};

/// Checks a descriptor before it is resolved. The checks run in a fixed order
/// and the first violation is returned.
pub fn validate(descriptor: &ConnectionDescriptor) -> Result<(), ProfileError> {
    if descriptor.clusters.is_empty() {
        return Err(ProfileError::validation("No cluster found in config"));
    }
    if descriptor.users.is_empty() {
        return Err(ProfileError::validation("No user found in config"));
    }
    if descriptor.contexts.is_empty() {
        return Err(ProfileError::validation("No context found in config"));
    }

    if descriptor.current_context.is_empty() {
        return Err(ProfileError::validation(
            "No current-context found in config",
        ));
    }
    let context = descriptor
        .context(&descriptor.current_context)
        .ok_or_else(|| {
            ProfileError::validation(format!(
                "current-context {} not found in contexts",
                descriptor.current_context
            ))
        })?;

    let cluster = descriptor.cluster(&context.context.cluster).ok_or_else(|| {
        ProfileError::validation(format!(
            "cluster {} not found in clusters",
            context.context.cluster
        ))
    })?;
    let user = descriptor.user(&context.context.user).ok_or_else(|| {
        ProfileError::validation(format!("user {} not found in users", context.context.user))
    })?;

    if cluster.cluster.uses_tls() && !user.user.has_client_certificate() {
        return Err(ProfileError::validation(format!(
            "user {} client-certificate-data or client-key-data not found in users",
            user.name
        )));
    }

    Ok(())
}
