use std::collections::BTreeMap;

use derive_more::Display;
use serde::Serialize;
use tracing::debug;

use super::super::parser::{types::GameString, GameObjectMap, GameObjectMapping, Node};

/// The resources we keep track of.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    #[display("Energy")]
    Energy,
    #[display("Minerals")]
    Minerals,
    #[display("Food")]
    Food,
    #[display("Influence")]
    Influence,
    #[display("Unity")]
    Unity,
    #[display("Alloys")]
    Alloys,
    #[display("Consumer Goods")]
    ConsumerGoods,
}

impl Resource {
    /// How many resources there are
    pub const COUNT: usize = 7;

    pub const ALL: [Resource; Resource::COUNT] = [
        Resource::Energy,
        Resource::Minerals,
        Resource::Food,
        Resource::Influence,
        Resource::Unity,
        Resource::Alloys,
        Resource::ConsumerGoods,
    ];

    /// The key the save file uses for the resource
    pub fn key(&self) -> &'static str {
        match self {
            Resource::Energy => "energy",
            Resource::Minerals => "minerals",
            Resource::Food => "food",
            Resource::Influence => "influence",
            Resource::Unity => "unity",
            Resource::Alloys => "alloys",
            Resource::ConsumerGoods => "consumer_goods",
        }
    }

    /// The resource a save file key stands for, if it is one we track
    pub fn from_key(key: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|r| r.key() == key)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Monthly flow and current stockpile of a single resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub income: f64,
    pub expense: f64,
    pub stockpile: f64,
}

impl ResourceEntry {
    /// Income minus expense
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// The economy of a country, one [ResourceEntry] per [Resource], plus one
/// per any other key the budget mentions, like `sr_zro` or
/// `physics_research`. Anything the save doesn't mention is zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: [ResourceEntry; Resource::COUNT],
    other: BTreeMap<GameString, ResourceEntry>,
}

static EMPTY_ENTRY: ResourceEntry = ResourceEntry {
    income: 0.0,
    expense: 0.0,
    stockpile: 0.0,
};

/// Which number of an entry a budget block adds to
#[derive(Clone, Copy)]
enum Flow {
    Income,
    Expense,
}

impl Ledger {
    /// Reads the ledger from a country record.
    /// The flows come from `budget.last_month`, or `budget.current_month`
    /// early in a game. Saves that only record the `balance` of each
    /// category get the net balance as income.
    pub fn from_country(base: &GameObjectMap) -> Self {
        let mut ledger = Ledger::default();
        let month = base
            .optional_map("budget")
            .and_then(|budget| {
                budget
                    .optional_map("last_month")
                    .or_else(|| budget.optional_map("current_month"))
            });
        if let Some(month) = month {
            let income = month.optional_map("income");
            let expenses = month.optional_map("expenses");
            if income.is_none() && expenses.is_none() {
                if let Some(balance) = month.optional_map("balance") {
                    ledger.add_categories(balance, Flow::Income);
                }
            } else {
                if let Some(income) = income {
                    ledger.add_categories(income, Flow::Income);
                }
                if let Some(expenses) = expenses {
                    ledger.add_categories(expenses, Flow::Expense);
                }
            }
        } else {
            debug!("country has no budget");
        }
        let stockpile = base
            .optional_map("modules")
            .and_then(|m| m.optional_map("standard_economy_module"))
            .and_then(|m| m.optional_map("resources"));
        if let Some(stockpile) = stockpile {
            for (key, amount) in amounts(stockpile) {
                ledger.entry_mut(key).stockpile = amount;
            }
        }
        ledger
    }

    fn entry_mut(&mut self, key: &str) -> &mut ResourceEntry {
        match Resource::from_key(key) {
            Some(resource) => &mut self.entries[resource.index()],
            None => self.other.entry(GameString::from(key)).or_default(),
        }
    }

    /// Adds up the resources of every category of a budget block, like
    /// `income={ country_base={ energy=20 } planet_jobs={ energy=5 } }`.
    fn add_categories(&mut self, block: &GameObjectMap, flow: Flow) {
        for (_, category) in block {
            let Node::Map(category) = category else {
                continue;
            };
            for (key, amount) in amounts(category) {
                let entry = self.entry_mut(key);
                match flow {
                    Flow::Income => entry.income += amount,
                    Flow::Expense => entry.expense += amount,
                }
            }
        }
    }

    pub fn get(&self, resource: Resource) -> &ResourceEntry {
        &self.entries[resource.index()]
    }

    /// The entry of any budget key, fixed resources included.
    /// Keys the save never mentions are all zeroes.
    pub fn get_key(&self, key: &str) -> &ResourceEntry {
        match Resource::from_key(key) {
            Some(resource) => self.get(resource),
            None => self.other.get(key).unwrap_or(&EMPTY_ENTRY),
        }
    }

    /// Net monthly flow of the resource
    pub fn net(&self, resource: Resource) -> f64 {
        self.get(resource).net()
    }

    /// Net monthly flow of any budget key
    pub fn net_of(&self, key: &str) -> f64 {
        self.get_key(key).net()
    }

    /// The fixed resources, in order
    pub fn iter(&self) -> impl Iterator<Item = (Resource, &ResourceEntry)> {
        Resource::ALL.into_iter().zip(self.entries.iter())
    }

    /// Every entry by its save file key, the fixed resources first
    pub fn iter_keys(&self) -> impl Iterator<Item = (&str, &ResourceEntry)> {
        self.iter()
            .map(|(resource, entry)| (resource.key(), entry))
            .chain(self.other.iter().map(|(key, entry)| (key.as_ref(), entry)))
    }
}

/// The numeric values of a block, by key. Anything else is skipped.
fn amounts(block: &GameObjectMap) -> impl Iterator<Item = (&str, f64)> {
    block
        .iter()
        .filter_map(|(key, value)| match value.as_real() {
            Ok(amount) => Some((key.as_ref(), amount)),
            Err(_) => None,
        })
}

impl Serialize for Ledger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter_keys())
    }
}
