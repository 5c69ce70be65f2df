//! Immutable view state for the dashboard front ends.

use crate::model::Category;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub company: Option<String>,
    pub compare_with: Option<String>,
    pub category: Category,
    pub sidebar_collapsed: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            company: None,
            compare_with: None,
            category: Category::Liquidity,
            sidebar_collapsed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectCompany(String),
    CompareWith(String),
    SelectCategory(Category),
    ToggleSidebar,
    /// Snap back to a category the loaded data actually has.
    DataLoaded { available: Vec<Category> },
}

impl ViewState {
    #[must_use]
    pub fn reduce(&self, action: Action) -> Self {
        let mut next = self.clone();
        match action {
            Action::SelectCompany(ticker) => {
                let ticker = ticker.trim().to_uppercase();
                if next.compare_with.as_deref() == Some(ticker.as_str()) {
                    next.compare_with = None;
                }
                next.company = Some(ticker);
            }
            Action::CompareWith(ticker) => {
                let ticker = ticker.trim().to_uppercase();
                if next.company.as_deref() != Some(ticker.as_str()) {
                    next.compare_with = Some(ticker);
                }
            }
            Action::SelectCategory(category) => next.category = category,
            Action::ToggleSidebar => next.sidebar_collapsed = !next.sidebar_collapsed,
            Action::DataLoaded { available } => {
                if !available.is_empty() && !available.contains(&next.category) {
                    next.category = available[0];
                }
            }
        }
        next
    }

    /// Applies `actions` in order.
    #[must_use]
    pub fn replay<I>(&self, actions: I) -> Self
    where
        I: IntoIterator<Item = Action>,
    {
        actions
            .into_iter()
            .fold(self.clone(), |state, action| state.reduce(action))
    }
}
