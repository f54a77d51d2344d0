use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The category a transaction is filed under.
///
/// The set is open: the labels offered when creating a transaction are known variants, and any
/// other label the server sends back is kept verbatim in `Unrecognized` so that it round-trips.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Category {
    FoodAndDrinks,
    Shopping,
    Transportation,
    Entertainment,
    Bills,
    Income,
    Other,
    Unrecognized(String),
}

impl Category {
    /// The categories offered when creating a new transaction, in display order.
    pub const KNOWN: [Category; 7] = [
        Category::FoodAndDrinks,
        Category::Shopping,
        Category::Transportation,
        Category::Entertainment,
        Category::Bills,
        Category::Income,
        Category::Other,
    ];

    pub fn label(&self) -> &str {
        match self {
            Category::FoodAndDrinks => FOOD_AND_DRINKS_STR,
            Category::Shopping => SHOPPING_STR,
            Category::Transportation => TRANSPORTATION_STR,
            Category::Entertainment => ENTERTAINMENT_STR,
            Category::Bills => BILLS_STR,
            Category::Income => INCOME_STR,
            Category::Other => OTHER_STR,
            Category::Unrecognized(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }

    /// An emoji used as the category's icon in transaction listings.
    pub fn icon(&self) -> &'static str {
        match self {
            Category::FoodAndDrinks => "🍕",
            Category::Shopping => "🛍️",
            Category::Transportation => "🚗",
            Category::Entertainment => "🎬",
            Category::Bills => "⚡",
            Category::Income => "💰",
            Category::Other => DEFAULT_ICON,
            Category::Unrecognized(label) => match label.to_lowercase().as_str() {
                "rent" => "🏠",
                "salary" => "💰",
                "groceries" => "🛒",
                "phone bill" => "📱",
                "freelance work" => "💻",
                "food" => "🍕",
                "transport" => "🚗",
                "utilities" => "⚡",
                _ => DEFAULT_ICON,
            },
        }
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        let trimmed = label.trim();
        Category::KNOWN
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Category::Unrecognized(trimmed.to_string()))
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from(label.as_str())
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Category::from(s))
    }
}

const DEFAULT_ICON: &str = "💳";

pub(super) const FOOD_AND_DRINKS_STR: &str = "Food & Drinks";
pub(super) const SHOPPING_STR: &str = "Shopping";
pub(super) const TRANSPORTATION_STR: &str = "Transportation";
pub(super) const ENTERTAINMENT_STR: &str = "Entertainment";
pub(super) const BILLS_STR: &str = "Bills";
pub(super) const INCOME_STR: &str = "Income";
pub(super) const OTHER_STR: &str = "Other";
