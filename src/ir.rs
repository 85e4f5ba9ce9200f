use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Attribute key holding the person's gender (`M`, `F` or absent).
pub const GENDER_KEY: &str = "gender";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    /// Gender given to a synthesized partner. Unknown genders pair with a male slot.
    pub fn partner_of(gender: Option<Self>) -> Self {
        match gender {
            Some(Self::Male) => Self::Female,
            _ => Self::Male,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub spouses: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    /// Open attribute bag. Only `gender` is read by the layout.
    #[serde(rename = "data", default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(rename = "rels", default)]
    pub relationships: Relationships,
    #[serde(default, skip_serializing_if = "is_false")]
    pub to_add: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unknown: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Person {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            relationships: Relationships::default(),
            to_add: false,
            unknown: false,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.set_gender(Some(gender));
        self
    }

    pub fn with_parents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.parents = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_spouses<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.spouses = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.children = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn gender(&self) -> Option<Gender> {
        self.attributes
            .get(GENDER_KEY)
            .and_then(|token| Gender::from_token(token))
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        match gender {
            Some(gender) => {
                self.attributes
                    .insert(GENDER_KEY.to_string(), gender.as_token().to_string());
            }
            None => {
                self.attributes.remove(GENDER_KEY);
            }
        }
    }

    pub fn is_female(&self) -> bool {
        self.gender() == Some(Gender::Female)
    }

    pub fn is_male(&self) -> bool {
        self.gender() == Some(Gender::Male)
    }

    /// Synthetic or explicitly unknown persons are not treated as real relatives.
    pub fn is_placeholder(&self) -> bool {
        self.to_add || self.unknown
    }

    pub fn all_relative_ids(&self) -> impl Iterator<Item = &String> {
        let rels = &self.relationships;
        rels.parents
            .iter()
            .chain(rels.spouses.iter())
            .chain(rels.children.iter())
            .filter(|id| !id.is_empty())
    }
}

/// Id-indexed view over an ordered person list.
///
/// Lookups go through the index so that traversals never depend on object
/// identity; iteration follows input order.
#[derive(Debug, Clone, Default)]
pub struct Family {
    persons: Vec<Person>,
    index: HashMap<String, usize>,
}

impl Family {
    pub fn new(persons: Vec<Person>) -> Self {
        let mut index = HashMap::with_capacity(persons.len());
        for (idx, person) in persons.iter().enumerate() {
            index.entry(person.id.clone()).or_insert(idx);
        }
        Self { persons, index }
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn into_persons(self) -> Vec<Person> {
        self.persons
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.position(id).map(|idx| &self.persons[idx])
    }

    pub fn at(&self, idx: usize) -> &Person {
        &self.persons[idx]
    }

    pub fn at_mut(&mut self, idx: usize) -> &mut Person {
        &mut self.persons[idx]
    }

    pub fn push(&mut self, person: Person) -> usize {
        let idx = self.persons.len();
        self.index.entry(person.id.clone()).or_insert(idx);
        self.persons.push(person);
        idx
    }
}
