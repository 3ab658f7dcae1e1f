use sea_orm::entity::prelude::*;

use super::task;
use crate::model::GoalUnit;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub target_value: f64,
    pub unit: String,
    pub custom_unit: Option<String>,
    pub period: String,
    pub start_date: Date,
    pub end_date: Date,
    pub current_value: f64,
    pub status: String,
    pub is_ladder: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn unit_label(&self) -> &str {
        match (GoalUnit::parse(&self.unit), self.custom_unit.as_deref()) {
            (Some(GoalUnit::Custom), Some(name)) => name,
            _ => self.unit.as_str(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Task,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Task => Entity::has_many(task::Entity).into(),
        }
    }
}

impl Related<task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
