//! User-facing strings for network status

use crate::classifier::{NetworkSuggestion, NetworkWarning, PrivacyLevel};
use crate::routing::{RoutingCause, RoutingState};

/// Short label for a privacy level
pub fn level_label(level: PrivacyLevel) -> &'static str {
    match level {
        PrivacyLevel::Good => "Private connection",
        PrivacyLevel::Moderate => "Mostly private connection",
        PrivacyLevel::Caution => "Use caution on this network",
        PrivacyLevel::Offline => "Offline",
        PrivacyLevel::Unknown => "Connection privacy unknown",
    }
}

/// Warning text
pub fn warning_text(warning: NetworkWarning) -> &'static str {
    match warning {
        NetworkWarning::UntrustedWifi => {
            "Others on this Wi-Fi network may be able to see which sites you visit."
        }
        NetworkWarning::UnidentifiedWifi => "This Wi-Fi network couldn't be identified.",
        NetworkWarning::SharedInfrastructure => {
            "Your traffic passes through a network operator we can't verify."
        }
        NetworkWarning::StatusUnavailable => "Couldn't check your connection right now.",
    }
}

/// Suggestion text
pub fn suggestion_text(suggestion: NetworkSuggestion) -> &'static str {
    match suggestion {
        NetworkSuggestion::TrustOrAvoid => {
            "If this is your own network, mark it as trusted. Otherwise avoid sensitive searches here."
        }
        NetworkSuggestion::UseMobileData => "Switch to mobile data for sensitive searches.",
        NetworkSuggestion::EnableAnonymityRouting => {
            "Turn on anonymity routing to hide which sites you visit."
        }
    }
}

/// Routing status message
pub fn routing_message(state: RoutingState, cause: Option<RoutingCause>) -> &'static str {
    match (state, cause) {
        (RoutingState::Disabled, _) => "Anonymity routing is off.",
        (RoutingState::EnabledNoProxy, _) => {
            "Install the proxy app to use anonymity routing."
        }
        (RoutingState::EnabledConnected, _) => "Connected through the onion network.",
        (RoutingState::EnabledProxyUnreachable, Some(RoutingCause::OfflineMode)) => {
            "Offline mode is on, so the onion connection can't be checked."
        }
        (RoutingState::EnabledProxyUnreachable, Some(RoutingCause::TimedOut)) => {
            "The proxy app didn't respond in time."
        }
        (RoutingState::EnabledProxyUnreachable, Some(RoutingCause::VerificationFailed)) => {
            "The proxy app is running but traffic isn't reaching the onion network."
        }
        (RoutingState::EnabledProxyUnreachable, None) => {
            "The proxy app isn't running. Open it to connect."
        }
    }
}
