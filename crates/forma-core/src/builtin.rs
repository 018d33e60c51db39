//! Schemas the system ships with.
//!
//! These are seeded once at start-up through
//! [`SchemaStore::ensure_builtins_seeded`](crate::store::SchemaStore::ensure_builtins_seeded)
//! and are protected from deletion afterwards.

use crate::schema::{FieldSpec, FieldType, SchemaDefinition};

/// The built-in whose generations are themselves schema definitions.
pub const NEW_SCHEMA: &str = "NewSchema";

/// Instructions sent alongside a cast whose target is [`new_schema`].
pub const NEW_SCHEMA_INSTRUCTIONS: &str = "the prompt should be short and give a user an understanding of what \
   text they need to provide. note that the user does not need to provide all \
   fields, they can give a fuzzy description. for fields, return a list of \
   objects with name, type, and description. type must be one of: string, \
   integer, boolean, number, list, dict. ensure each field has a clear, \
   concise description.";

fn builtin(
  name: &str,
  description: &str,
  prompt: &str,
  fields: Vec<FieldSpec>,
) -> SchemaDefinition {
  SchemaDefinition {
    name: name.to_owned(),
    description: description.to_owned(),
    prompt: prompt.to_owned(),
    fields,
    is_builtin: true,
  }
}

/// The shape of a schema definition, used as a cast target when generating or
/// rewriting schemas.
pub fn new_schema() -> SchemaDefinition {
  builtin(
    NEW_SCHEMA,
    "Generate a new structured output schema",
    "Describe the schema you want to create (e.g. User, Location, Movie, \
     etc.), what attributes do these things have?",
    vec![
      FieldSpec::new("name", FieldType::String, "The name of the schema"),
      FieldSpec::new(
        "description",
        FieldType::String,
        "A description of what this schema is for",
      ),
      FieldSpec::new(
        "prompt",
        FieldType::String,
        "The prompt to show users when using this schema",
      ),
      FieldSpec::new(
        "fields",
        FieldType::List,
        "List of fields in the schema, each with name, type \
         (string/integer/boolean/number/list/dict), and description",
      ),
    ],
  )
}

/// Every built-in definition, in seeding order.
pub fn definitions() -> Vec<SchemaDefinition> {
  vec![
    new_schema(),
    builtin(
      "WhatPokemonAmI",
      "A pokemon representative of a personality",
      "Tell me about yourself",
      vec![
        FieldSpec::new("name", FieldType::String, "The name of the pokemon"),
        FieldSpec::new("type", FieldType::String, "The type of the pokemon"),
        FieldSpec::new(
          "description",
          FieldType::String,
          "A short description of the pokemon",
        ),
        FieldSpec::new(
          "rarity",
          FieldType::String,
          "The rarity level (common, uncommon, rare, epic, legendary)",
        ),
      ],
    ),
    builtin(
      "SQLQuery",
      "A SQL query from natural language",
      "Describe your desired SQL in natural language",
      vec![
        FieldSpec::new("query", FieldType::String, "The SQL query string"),
        FieldSpec::new("parameters", FieldType::Dict, "Optional query parameters"),
      ],
    ),
    builtin(
      "ExecutiveSummary",
      "An executive summary with key points and tags",
      "Enter any text you want to summarize into key points and tags",
      vec![
        FieldSpec::new(
          "main_points",
          FieldType::List,
          "List of key points as short sentences",
        ),
        FieldSpec::new("tags", FieldType::List, "List of single-word tags"),
      ],
    ),
  ]
}
