use crate::entities::{prelude::*, *};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// A post joined with its author's username
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostView {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted posts. Posts are append-only: there is no update or delete.
#[derive(Clone)]
pub struct ContentStore {
    db: DatabaseConnection,
}

impl ContentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        owner: &users::Model,
        title: &str,
        body: &str,
    ) -> Result<posts::Model, DbErr> {
        let post = posts::ActiveModel {
            title: Set(title.to_string()),
            body: Set(body.to_string()),
            timestamp: Set(Utc::now()),
            user_id: Set(owner.id),
            ..Default::default()
        };

        let post = post.insert(&self.db).await?;
        tracing::info!("📝 Post {} created by '{}'", post.id, owner.username);
        Ok(post)
    }

    /// All posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<PostView>, DbErr> {
        let posts = Posts::find()
            .order_by_desc(posts::Column::Timestamp)
            .order_by_desc(posts::Column::Id)
            .all(&self.db)
            .await?;

        let author_ids: HashSet<i32> = posts.iter().map(|p| p.user_id).collect();
        let authors: HashMap<i32, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            Users::find()
                .filter(users::Column::Id.is_in(author_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        Ok(posts
            .into_iter()
            .map(|p| PostView {
                author: authors.get(&p.user_id).cloned(),
                id: p.id,
                title: p.title,
                body: p.body,
                timestamp: p.timestamp,
            })
            .collect())
    }
}
