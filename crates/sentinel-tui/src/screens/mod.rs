//! Screen implementations. Each screen is a top-level Component.

pub mod dashboard;
pub mod incidents;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create one component per tab.
pub fn create_screens() -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (
            ScreenId::Dashboard,
            Box::new(dashboard::DashboardScreen::new()),
        ),
        (
            ScreenId::Incidents,
            Box::new(incidents::IncidentsScreen::new()),
        ),
    ]
}
