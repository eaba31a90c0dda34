use serde::Serialize;

pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Pro,
    Team,
}

impl PlanId {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(PlanId::Free),
            "pro" => Some(PlanId::Pro),
            "team" => Some(PlanId::Team),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Pro => "pro",
            PlanId::Team => "team",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    EventTypes,
    BookingsPerMonth,
    TeamMembers,
    CalendarIntegrations,
}

impl Feature {
    fn label(&self) -> &'static str {
        match self {
            Feature::EventTypes => "event types",
            Feature::BookingsPerMonth => "bookings this month",
            Feature::TeamMembers => "team members",
            Feature::CalendarIntegrations => "calendar integrations",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub event_types: i64,
    pub bookings_per_month: i64,
    pub team_members: i64,
    pub calendar_integrations: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub price: u32,
    pub limits: PlanLimits,
}

const FREE: Plan = Plan {
    id: PlanId::Free,
    name: "Free",
    price: 0,
    limits: PlanLimits { event_types: 1, bookings_per_month: 5, team_members: 1, calendar_integrations: false },
};

const PRO: Plan = Plan {
    id: PlanId::Pro,
    name: "Pro",
    price: 12,
    limits: PlanLimits { event_types: UNLIMITED, bookings_per_month: UNLIMITED, team_members: 1, calendar_integrations: true },
};

const TEAM: Plan = Plan {
    id: PlanId::Team,
    name: "Team",
    price: 29,
    limits: PlanLimits { event_types: UNLIMITED, bookings_per_month: UNLIMITED, team_members: UNLIMITED, calendar_integrations: true },
};

pub fn all_plans() -> [Plan; 3] {
    [FREE, PRO, TEAM]
}

/// Unknown or missing ids resolve to the free plan.
pub fn get_plan_by_id(id: Option<&str>) -> Plan {
    match id.and_then(PlanId::parse) {
        Some(PlanId::Pro) => PRO,
        Some(PlanId::Team) => TEAM,
        _ => FREE,
    }
}

impl Plan {
    fn numeric_limit(&self, feature: Feature) -> Option<i64> {
        match feature {
            Feature::EventTypes => Some(self.limits.event_types),
            Feature::BookingsPerMonth => Some(self.limits.bookings_per_month),
            Feature::TeamMembers => Some(self.limits.team_members),
            Feature::CalendarIntegrations => None,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        match self.numeric_limit(feature) {
            Some(limit) => limit == UNLIMITED || limit > 0,
            None => self.limits.calendar_integrations,
        }
    }

    /// Whether one more unit fits under the limit given `current_count`.
    pub fn within_limit(&self, feature: Feature, current_count: i64) -> bool {
        match self.numeric_limit(feature) {
            Some(UNLIMITED) => true,
            Some(limit) => current_count < limit,
            None => self.limits.calendar_integrations,
        }
    }

    pub fn limit_message(&self, feature: Feature) -> String {
        match self.numeric_limit(feature) {
            Some(limit) => format!(
                "The {} plan allows {} {}. Upgrade your plan to add more.",
                self.name, limit, feature.label()
            ),
            None => format!("The {} plan does not include {}.", self.name, feature.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_plan_defaults_to_free() {
        assert_eq!(get_plan_by_id(None).id, PlanId::Free);
        assert_eq!(get_plan_by_id(Some("enterprise")).id, PlanId::Free);
        assert_eq!(get_plan_by_id(Some("team")).id, PlanId::Team);
    }

    #[test]
    fn test_free_plan_limits() {
        let free = get_plan_by_id(Some("free"));
        assert!(free.within_limit(Feature::BookingsPerMonth, 4));
        assert!(!free.within_limit(Feature::BookingsPerMonth, 5));
        assert!(free.within_limit(Feature::EventTypes, 0));
        assert!(!free.within_limit(Feature::EventTypes, 1));
        assert!(!free.has_feature(Feature::CalendarIntegrations));
        assert!(free.limit_message(Feature::EventTypes).contains("1 event types"));
    }

    #[test]
    fn test_paid_plans() {
        let pro = get_plan_by_id(Some("pro"));
        assert!(pro.within_limit(Feature::BookingsPerMonth, 10_000));
        assert!(!pro.within_limit(Feature::TeamMembers, 1));
        assert!(pro.has_feature(Feature::CalendarIntegrations));

        let team = get_plan_by_id(Some("team"));
        assert!(team.within_limit(Feature::TeamMembers, 500));
        assert!(team.has_feature(Feature::EventTypes));
    }
}
