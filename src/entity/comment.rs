use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "t_comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub post_id: String,
    pub author_name: String,
    /// Supplied by the submitter; only ever serialized into admin payloads.
    pub author_email: Option<String>,
    pub content: String,
    pub created: DateTimeUtc,
    pub approved: bool,
    pub archived: bool,
    pub flagged: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
