//! Model-role registry: keeps the profile list consistent with the primary model.
//!
//! All functions are pure; they take the current list and return a new one.

use super::schema::{FALLBACK_EMBEDDINGS_MODEL, ModelProfile, ModelRole};

/// First profile carrying `role`, in list order.
pub fn find_by_role(models: &[ModelProfile], role: ModelRole) -> Option<&ModelProfile> {
    models.iter().find(|m| m.has_role(role))
}

/// Point the canonical chat profile at `primary`.
///
/// The first profile with the `chat` role is canonical. Its provider and roles
/// are kept; `model` is replaced, and `name` follows unless another profile
/// already uses that name. Without a chat profile a new one is appended.
pub fn sync_primary_model(models: &[ModelProfile], primary: &str) -> Vec<ModelProfile> {
    let mut out = models.to_vec();

    match out.iter().position(|m| m.has_role(ModelRole::Chat)) {
        Some(idx) => {
            let name_taken = out
                .iter()
                .enumerate()
                .any(|(i, m)| i != idx && m.name == primary);

            let current = &out[idx];
            let replacement = ModelProfile {
                name: if name_taken {
                    current.name.clone()
                } else {
                    primary.to_string()
                },
                provider: current.provider,
                model: primary.to_string(),
                roles: current.roles.clone(),
            };
            out[idx] = replacement;
        }
        None => out.push(ModelProfile::chat(primary)),
    }

    out
}

/// Make sure some profile carries the `embed` role.
pub fn ensure_embeddings_profile(models: &[ModelProfile]) -> Vec<ModelProfile> {
    let mut out = models.to_vec();
    if find_by_role(&out, ModelRole::Embed).is_none() {
        out.push(ModelProfile::embeddings(FALLBACK_EMBEDDINGS_MODEL));
    }
    out
}

/// Replace the profile with the same name, or append it.
pub fn upsert_profile(models: &[ModelProfile], profile: ModelProfile) -> Vec<ModelProfile> {
    let mut out = models.to_vec();
    match out.iter_mut().find(|m| m.name == profile.name) {
        Some(existing) => *existing = profile,
        None => out.push(profile),
    }
    out
}

/// Drop the profile named `name`. Returns `None` when there is no such profile.
pub fn remove_profile(models: &[ModelProfile], name: &str) -> Option<Vec<ModelProfile>> {
    if !models.iter().any(|m| m.name == name) {
        return None;
    }
    Some(models.iter().filter(|m| m.name != name).cloned().collect())
}
