//! SeaORM Entity for notes table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Public identifier used in URLs. Issued by the token source, not the database.
    #[sea_orm(unique)]
    pub token: String,
    pub author_id: i32,
    /// A note posted into a circle is only visible to its members.
    pub circle_id: Option<i32>,
    pub title: String,
    pub body: String,
    pub is_published: bool,
    pub stock_count: i32,
    pub like_count: i32,
    pub comment_count: i32,
    pub created_at: DateTime,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(
        belongs_to = "super::circles::Entity",
        from = "Column::CircleId",
        to = "super::circles::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Circle,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::note_topics::Entity")]
    NoteTopics,
    #[sea_orm(has_many = "super::stocks::Entity")]
    Stocks,
    #[sea_orm(has_many = "super::likes::Entity")]
    Likes,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::circles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Circle.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::topics::Entity> for Entity {
    fn to() -> RelationDef {
        super::note_topics::Relation::Topic.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::note_topics::Relation::Note.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
