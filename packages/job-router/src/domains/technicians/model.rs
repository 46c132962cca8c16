//! Technician entity: an employee of a company who can be the creator of a job.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::{CompanyId, TechnicianId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct Technician {
    #[builder(default = TechnicianId::new())]
    pub id: TechnicianId,
    pub name: String,
    #[builder(default, setter(strip_option))]
    pub phone: Option<String>,
    #[builder(default, setter(strip_option))]
    pub email: Option<String>,
    pub company_id: CompanyId,
}
