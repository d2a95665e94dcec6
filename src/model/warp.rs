use serde::Deserialize;
use serde::Serialize;

/// Where a menu link opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Same window, the link points into the ecosystem
    #[serde(rename = "self")]
    Internal,
    #[serde(rename = "external")]
    External,
}

/// Link in the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    pub display_name: String,
    pub href: String,
    pub title: String,
    pub target: Target,
}

/// Entry together with the title of the category it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWithCategory {
    pub entry: Entry,
    pub category: String,
}

/// Group of menu links, identified by its title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
    pub title: String,
    pub order: i64,
    pub entries: Vec<Entry>,
}

/// The menu. Titles are unique; [`Categories::sort`] establishes the
/// published order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(Vec<Category>);

impl Categories {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Groups entries by category title.
    pub fn from_entries(
        entries: impl IntoIterator<Item = EntryWithCategory>,
        order_of: impl Fn(&str) -> i64,
    ) -> Self {
        let mut categories = Categories::new();
        for EntryWithCategory { entry, category } in entries {
            categories.insert(Category {
                order: order_of(&category),
                title: category,
                entries: vec![entry],
            });
        }
        categories
    }

    /// Adds a category, merging its entries into an existing category of
    /// the same title.
    pub fn insert(
        &mut self,
        category: Category,
    ) {
        match self.0.iter_mut().find(|c| c.title == category.title) {
            Some(existing) => existing.entries.extend(category.entries),
            None => self.0.push(category),
        }
    }

    pub fn merge(
        &mut self,
        other: Categories,
    ) {
        for category in other.0 {
            self.insert(category);
        }
    }

    /// Entries ascending by display name, categories descending by order
    /// and ascending by title on equal order.
    pub fn sort(&mut self) {
        for category in &mut self.0 {
            category.entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        }
        self.0
            .sort_by(|a, b| b.order.cmp(&a.order).then_with(|| a.title.cmp(&b.title)));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(
        &self,
        title: &str,
    ) -> Option<&Category> {
        self.0.iter().find(|c| c.title == title)
    }
}

impl From<Vec<Category>> for Categories {
    fn from(categories: Vec<Category>) -> Self {
        Self(categories)
    }
}

impl IntoIterator for Categories {
    type Item = Category;
    type IntoIter = std::vec::IntoIter<Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
