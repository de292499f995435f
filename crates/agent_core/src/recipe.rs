//! Recipe registry: the static catalogue of craftable items, their
//! ingredients, byproducts, and the stations that can perform them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientSpec {
    pub item: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSpec {
    pub item: String,
    /// Real-valued, matching amounts like uranium processing's
    /// fractional byproduct rates.
    pub amount: f64,
    #[serde(default)]
    pub byproduct: bool,
}

impl ProductSpec {
    pub fn new(item: impl Into<String>, amount: f64) -> Self {
        Self { item: item.into(), amount, byproduct: false }
    }

    pub fn new_byproduct(item: impl Into<String>, amount: f64) -> Self {
        Self { item: item.into(), amount, byproduct: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub stations: Vec<String>,
    pub inputs: Vec<IngredientSpec>,
    pub outputs: Vec<ProductSpec>,
    pub energy_seconds: f64,
    pub work_time_ticks: u32,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RecipeValidationError {
    #[error("recipe {0:?} has no stations it can be crafted at")]
    NoStations(String),
    #[error("recipe {0:?} produces no outputs")]
    NoOutputs(String),
    #[error("recipe {0:?} has a zero-amount ingredient {1:?}")]
    ZeroAmountIngredient(String, String),
}

impl Recipe {
    pub fn validate(&self) -> Result<(), RecipeValidationError> {
        if self.stations.is_empty() {
            return Err(RecipeValidationError::NoStations(self.id.clone()));
        }
        if self.outputs.is_empty() {
            return Err(RecipeValidationError::NoOutputs(self.id.clone()));
        }
        for input in &self.inputs {
            if input.amount == 0 {
                return Err(RecipeValidationError::ZeroAmountIngredient(self.id.clone(), input.item.clone()));
            }
        }
        Ok(())
    }

    /// Non-byproduct outputs only, used when deciding what a recipe is
    /// "for" as opposed to what it happens to also produce.
    pub fn primary_outputs(&self) -> impl Iterator<Item = &ProductSpec> {
        self.outputs.iter().filter(|o| !o.byproduct)
    }

    /// `Σproducts − Σingredients` for `item`, the net inventory effect of
    /// crafting this recipe once.
    pub fn balance_for(&self, item: &str) -> f64 {
        let produced: f64 = self.outputs.iter().filter(|o| o.item == item).map(|o| o.amount).sum();
        let consumed: f64 = self.inputs.iter().filter(|i| i.item == item).map(|i| i.amount as f64).sum();
        produced - consumed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeRegistryError {
    #[error("duplicate recipe id {0:?}")]
    DuplicateId(String),
    #[error("invalid recipe: {0}")]
    Invalid(#[from] RecipeValidationError),
    #[error("failed to parse recipe json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The default recipe catalogue, embedded at build time so the agent can
/// start planning without waiting on a telemetry `recipes` packet.
const DEFAULT_RECIPES_JSON: &str = include_str!("../resources/recipes.json");

#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, RecipeRegistryError> {
        let recipes: Vec<Recipe> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for recipe in recipes {
            registry.insert(recipe)?;
        }
        Ok(registry)
    }

    pub fn load_default() -> Result<Self, RecipeRegistryError> {
        Self::from_json(DEFAULT_RECIPES_JSON)
    }

    pub fn insert(&mut self, recipe: Recipe) -> Result<(), RecipeRegistryError> {
        recipe.validate()?;
        if self.recipes.contains_key(&recipe.id) {
            return Err(RecipeRegistryError::DuplicateId(recipe.id));
        }
        self.recipes.insert(recipe.id.clone(), recipe);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    pub fn recipe_ids(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn recipes_for_station<'a>(&'a self, station: &'a str) -> impl Iterator<Item = &'a Recipe> + 'a {
        self.recipes.values().filter(move |r| r.stations.iter().any(|s| s == station))
    }

    /// Recipes that list `item` among their non-byproduct outputs, used by
    /// the scheduler when it needs to decide how to obtain a missing item.
    pub fn recipes_producing<'a>(&'a self, item: &'a str) -> impl Iterator<Item = &'a Recipe> + 'a {
        self.recipes.values().filter(move |r| r.primary_outputs().any(|o| o.item == item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: "iron-gear-wheel".to_string(),
            enabled: true,
            stations: vec!["assembling-machine-1".to_string()],
            inputs: vec![IngredientSpec { item: "iron-plate".to_string(), amount: 2 }],
            outputs: vec![ProductSpec::new("iron-gear-wheel", 1.0)],
            energy_seconds: 0.5,
            work_time_ticks: 30,
        }
    }

    #[test]
    fn validate_rejects_no_stations() {
        let mut r = sample_recipe();
        r.stations.clear();
        assert!(matches!(r.validate(), Err(RecipeValidationError::NoStations(_))));
    }

    #[test]
    fn validate_rejects_zero_amount_ingredient() {
        let mut r = sample_recipe();
        r.inputs[0].amount = 0;
        assert!(matches!(r.validate(), Err(RecipeValidationError::ZeroAmountIngredient(_, _))));
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let mut registry = RecipeRegistry::new();
        registry.insert(sample_recipe()).unwrap();
        let err = registry.insert(sample_recipe()).unwrap_err();
        assert!(matches!(err, RecipeRegistryError::DuplicateId(_)));
    }

    #[test]
    fn recipes_for_station_filters_correctly() {
        let mut registry = RecipeRegistry::new();
        registry.insert(sample_recipe()).unwrap();
        let found: Vec<_> = registry.recipes_for_station("assembling-machine-1").collect();
        assert_eq!(found.len(), 1);
        assert!(registry.recipes_for_station("furnace").next().is_none());
    }

    #[test]
    fn recipes_producing_ignores_byproducts() {
        let mut registry = RecipeRegistry::new();
        let mut r = sample_recipe();
        r.id = "smelting".to_string();
        r.outputs.push(ProductSpec::new_byproduct("iron-gear-wheel", 1.0));
        registry.insert(r).unwrap();
        let found: Vec<_> = registry.recipes_producing("iron-gear-wheel").collect();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn balance_for_nets_products_against_ingredients() {
        let r = sample_recipe();
        assert_eq!(r.balance_for("iron-gear-wheel"), 1.0);
        assert_eq!(r.balance_for("iron-plate"), -2.0);
    }

    #[test]
    fn load_default_parses_embedded_json() {
        let registry = RecipeRegistry::load_default().expect("default recipes must parse");
        assert!(!registry.is_empty());
    }
}
