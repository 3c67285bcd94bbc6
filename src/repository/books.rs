//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
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
                "(LOWER(title) LIKE ${i} OR LOWER(author) LIKE ${i} OR LOWER(COALESCE(isbn, '')) LIKE ${i})",
                i = bind_idx
            ));
        }
        if query.genre.is_some() {
            bind_idx += 1;
            conditions.push(format!("genre = ${}", bind_idx));
        }

        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", where_clause);
        let mut count = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref s) = search {
            count = count.bind(s);
        }
        if let Some(ref g) = query.genre {
            count = count.bind(g);
        }
        let total = count.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM books WHERE {} ORDER BY title LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select = sqlx::query_as::<_, Book>(&select_query);
        if let Some(ref s) = search {
            select = select.bind(s);
        }
        if let Some(ref g) = query.genre {
            select = select.bind(g);
        }
        let books = select.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book. Available copies start equal to total copies.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let now = Utc::now();
        let total = book.total_copies.unwrap_or(1);

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, isbn, genre, publication_year, description,
                total_copies, available_copies, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.genre)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(total)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book. A total-copies change recomputes availability from
    /// the number of copies currently on loan, under a row lock so it
    /// cannot race a concurrent borrow or return.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let (total, available) = match book.total_copies {
            Some(new_total) => {
                let borrowed = current.total_copies - current.available_copies;
                if new_total < borrowed {
                    return Err(AppError::Conflict(
                        ErrorCode::CopiesBelowBorrowed,
                        format!(
                            "Cannot reduce total copies to {}: {} copies are currently on loan",
                            new_total, borrowed
                        ),
                    ));
                }
                (new_total, new_total - borrowed)
            }
            None => (current.total_copies, current.available_copies),
        };

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                genre = COALESCE($5, genre),
                publication_year = COALESCE($6, publication_year),
                description = COALESCE($7, description),
                total_copies = $8,
                available_copies = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.genre)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(total)
        .bind(available)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book. Refused while any active loan references it; the
    /// loan history itself survives the deletion.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'active'",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(
                ErrorCode::HasActiveLoans,
                format!("Book has {} active loan(s)", active),
            ));
        }

        let deleted = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }

    /// Check if ISBN already exists
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };

        Ok(exists)
    }
}
