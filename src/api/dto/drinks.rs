/*
 * Responsibility
 * - Drinks の request/response DTO
 * - validate() で形式チェック (失敗は 422)
 * - short (一覧用: color/parts のみ) と long (全項目) の 2 つの表現
 */
use serde::{Deserialize, Serialize};

use crate::repos::drink_repo::{Drink, Ingredient};

const TITLE_MAX_LEN: usize = 80;

/// A recipe may arrive as a list or as a single ingredient object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    pub fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::Many(items) => items,
            RecipeInput::One(item) => vec![item],
        }
    }
}

fn validate_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("title is required");
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err("title must be <= 80 chars");
    }
    Ok(())
}

fn validate_recipe(recipe: &[Ingredient]) -> Result<(), &'static str> {
    if recipe.is_empty() {
        return Err("recipe needs at least one ingredient");
    }
    for ingredient in recipe {
        if ingredient.name.trim().is_empty() || ingredient.color.trim().is_empty() {
            return Err("ingredient name and color are required");
        }
        if ingredient.parts == 0 {
            return Err("ingredient parts must be positive");
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    /// Validated `(title, recipe)`.
    pub fn validate(self) -> Result<(String, Vec<Ingredient>), &'static str> {
        let title = self.title.ok_or("title is required")?;
        validate_title(&title)?;

        let recipe = self.recipe.ok_or("recipe is required")?.into_vec();
        validate_recipe(&recipe)?;

        Ok((title.trim().to_string(), recipe))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl UpdateDrinkRequest {
    pub fn validate(self) -> Result<(Option<String>, Option<Vec<Ingredient>>), &'static str> {
        let title = match self.title {
            Some(title) => {
                validate_title(&title)?;
                Some(title.trim().to_string())
            }
            None => None,
        };

        let recipe = match self.recipe {
            Some(recipe) => {
                let recipe = recipe.into_vec();
                validate_recipe(&recipe)?;
                Some(recipe)
            }
            None => None,
        };

        Ok((title, recipe))
    }
}

#[derive(Debug, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl From<Drink> for DrinkShort {
    fn from(d: Drink) -> Self {
        Self {
            id: d.id,
            title: d.title,
            recipe: d
                .recipe
                .into_iter()
                .map(|i| ShortIngredient {
                    color: i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl From<Drink> for DrinkLong {
    fn from(d: Drink) -> Self {
        Self {
            id: d.id,
            title: d.title,
            recipe: d.recipe,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i64,
}
