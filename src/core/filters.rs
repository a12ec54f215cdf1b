use crate::core::distance::vincenty_distance_km;
use crate::models::{Preferences, Profile};

/// Check if a candidate profile satisfies one user's preferences
///
/// Gender, age bounds (0 = unbounded) and the distance radius around the
/// preferred center. Fails closed when the distance cannot be computed.
pub fn profile_matches(preferences: &Preferences, profile: &Profile) -> bool {
    if let Some(gender) = preferences.gender {
        if profile.gender != Some(gender) {
            return false;
        }
    }

    if preferences.min_age != 0 && profile.age < preferences.min_age {
        return false;
    }

    if preferences.max_age != 0 && profile.age > preferences.max_age {
        return false;
    }

    let (Some(center), Some(location)) = (preferences.center(), profile.location()) else {
        return false;
    };

    match vincenty_distance_km(center, location) {
        Ok(distance_km) => distance_km <= preferences.radius_km,
        Err(e) => {
            tracing::warn!(
                "Distance between preferences of {} and profile {} not computable: {}",
                preferences.user_id,
                profile.user_id,
                e
            );
            false
        }
    }
}

/// Both users must accept each other
#[inline]
pub fn symmetric_match(
    a_preferences: &Preferences,
    a_profile: &Profile,
    b_preferences: &Preferences,
    b_profile: &Profile,
) -> bool {
    profile_matches(a_preferences, b_profile) && profile_matches(b_preferences, a_profile)
}
