//! Members repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::member::{CreateMember, Member, MemberQuery, MembershipStatus, UpdateMember},
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Search members with pagination
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = vec!["1=1".to_string()];
        let mut bind_idx = 0;

        let search = query
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.to_lowercase()));
        if search.is_some() {
            bind_idx += 1;
            conditions.push(format!(
                "(LOWER(name) LIKE ${i} OR LOWER(email) LIKE ${i})",
                i = bind_idx
            ));
        }
        if query.status.is_some() {
            bind_idx += 1;
            conditions.push(format!("membership_status = ${}", bind_idx));
        }

        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM members WHERE {}", where_clause);
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref s) = search {
            count = count.bind(s);
        }
        if let Some(status) = query.status {
            count = count.bind(status);
        }
        let total = count.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM members WHERE {} ORDER BY name LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select = sqlx::query_as::<_, Member>(&select_query);
        if let Some(ref s) = search {
            select = select.bind(s);
        }
        if let Some(status) = query.status {
            select = select.bind(status);
        }
        let members = select.fetch_all(&self.pool).await?;

        Ok((members, total))
    }

    /// Create a new member
    pub async fn create(&self, member: &CreateMember) -> AppResult<Member> {
        let now = Utc::now();
        let status = member.membership_status.unwrap_or(MembershipStatus::Active);
        let max_books = member.max_books.unwrap_or(5);

        let created = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (
                name, email, phone, address, membership_status, max_books,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(status)
        .bind(max_books)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a member. Status and cap changes never touch existing
    /// loans; a member over a newly lowered cap keeps them but cannot
    /// borrow more until back under it.
    pub async fn update(&self, id: i32, member: &UpdateMember) -> AppResult<Member> {
        let now = Utc::now();

        let updated = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                membership_status = COALESCE($6, membership_status),
                max_books = COALESCE($7, max_books),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.membership_status)
        .bind(member.max_books)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))?;

        Ok(updated)
    }

    /// Delete a member. Refused while any active loan references them;
    /// the loan history itself survives the deletion.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(
                ErrorCode::HasActiveLoans,
                format!("Member has {} active loan(s)", active),
            ));
        }

        let deleted = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }

        Ok(())
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE email = $1 AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };

        Ok(exists)
    }
}
