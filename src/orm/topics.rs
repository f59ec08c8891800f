//! SeaORM Entity for topics table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "topics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub note_count: i32,
    pub follower_count: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::note_topics::Entity")]
    NoteTopics,
    #[sea_orm(has_many = "super::topic_follows::Entity")]
    TopicFollows,
}

impl Related<super::note_topics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoteTopics.def()
    }
}

impl Related<super::topic_follows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TopicFollows.def()
    }
}

impl Related<super::notes::Entity> for Entity {
    fn to() -> RelationDef {
        super::note_topics::Relation::Note.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::note_topics::Relation::Topic.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
