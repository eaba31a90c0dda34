use std::sync::Arc;
use crate::domain::ports::{
    OrganizationRepository, UserRepository, ScheduleRepository, EventTypeRepository,
    BookingRepository, TagRepository, JobRepository, EmailService, CalendarService,
};
use crate::domain::services::auth_service::AuthService;
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub organization_repo: Arc<dyn OrganizationRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub schedule_repo: Arc<dyn ScheduleRepository>,
    pub event_type_repo: Arc<dyn EventTypeRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub tag_repo: Arc<dyn TagRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub auth_service: Arc<AuthService>,
    pub email_service: Arc<dyn EmailService>,
    pub calendar_service: Arc<dyn CalendarService>,
    pub templates: Arc<Tera>,
}
