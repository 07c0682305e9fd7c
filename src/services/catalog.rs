//! Catalog management service: categories and books

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{rebalance_available, Book, BookQuery, CreateBook, UpdateBook},
        category::{Category, CategoryQuery, CreateCategory, UpdateCategory},
        ActivityAction, NewActivity, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search_categories(&self, query: &CategoryQuery) -> AppResult<(Vec<Category>, i64)> {
        self.repository.categories.search(query).await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(
        &self,
        actor: &UserClaims,
        category: CreateCategory,
    ) -> AppResult<Category> {
        if self
            .repository
            .categories
            .name_exists(category.name.trim(), None)
            .await?
        {
            return Err(AppError::Conflict("Category name already exists".to_string()));
        }

        let mut uow = self.repository.begin().await?;
        let id = self.repository.categories.create(uow.conn(), &category).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::CreateCategory,
            "category",
            id,
            format!("Created category {}", category.name.trim()),
        ))
        .await?;
        uow.commit().await?;

        self.repository.categories.get_by_id(id).await
    }

    pub async fn update_category(
        &self,
        actor: &UserClaims,
        id: i32,
        category: UpdateCategory,
    ) -> AppResult<Category> {
        if let Some(ref name) = category.name {
            if self
                .repository
                .categories
                .name_exists(name.trim(), Some(id))
                .await?
            {
                return Err(AppError::Conflict("Category name already exists".to_string()));
            }
        }

        let mut uow = self.repository.begin().await?;
        self.repository
            .categories
            .update(uow.conn(), id, &category)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::UpdateCategory,
            "category",
            id,
            format!("Updated category {}", id),
        ))
        .await?;
        uow.commit().await?;

        self.repository.categories.get_by_id(id).await
    }

    pub async fn delete_category(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        let name = self.repository.categories.delete(uow.conn(), id).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::DeleteCategory,
            "category",
            id,
            format!("Deleted category {}", name),
        ))
        .await?;
        uow.commit().await?;

        Ok(())
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    async fn check_category(&self, category_id: Option<i32>) -> AppResult<()> {
        if let Some(category_id) = category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::Validation(format!(
                    "Category with id {} does not exist",
                    category_id
                )));
            }
        }
        Ok(())
    }

    pub async fn create_book(&self, actor: &UserClaims, book: CreateBook) -> AppResult<Book> {
        self.check_category(book.category_id).await?;

        let mut uow = self.repository.begin().await?;
        let id = self.repository.books.create(uow.conn(), &book).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::CreateBook,
            "book",
            id,
            format!("Created book {} ({} copies)", book.title.trim(), book.quantity),
        ))
        .await?;
        uow.commit().await?;

        self.repository.books.get_by_id(id).await
    }

    /// Update a book; a quantity change shifts the shelf count by the same delta
    pub async fn update_book(&self, actor: &UserClaims, id: i32, book: UpdateBook) -> AppResult<Book> {
        self.check_category(book.category_id).await?;

        let mut uow = self.repository.begin().await?;
        let current = self.repository.books.get_for_update(uow.conn(), id).await?;

        let (quantity, available) = match book.quantity {
            Some(new_quantity) => (
                new_quantity,
                rebalance_available(current.quantity, current.available, new_quantity)?,
            ),
            None => (current.quantity, current.available),
        };

        self.repository
            .books
            .update(uow.conn(), id, &book, quantity, available)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::UpdateBook,
            "book",
            id,
            format!("Updated book {}", current.title),
        ))
        .await?;
        uow.commit().await?;

        self.repository.books.get_by_id(id).await
    }

    /// Delete a book that is neither lent out nor part of a waiting request
    pub async fn delete_book(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        let book = self.repository.books.get_for_update(uow.conn(), id).await?;

        if book.borrowed() > 0 {
            return Err(AppError::Conflict(format!(
                "{} copies of this book are currently borrowed",
                book.borrowed()
            )));
        }
        if self.repository.books.in_waiting_request(uow.conn(), id).await? {
            return Err(AppError::Conflict(
                "This book is part of a waiting borrowing request".to_string(),
            ));
        }

        self.repository.books.delete(uow.conn(), id).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::DeleteBook,
            "book",
            id,
            format!("Deleted book {}", book.title),
        ))
        .await?;
        uow.commit().await?;

        Ok(())
    }
}
