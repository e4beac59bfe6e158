use serde::Serialize;
use thiserror::Error;

use crate::settings::{City, Settings};

pub const MAX_SECONDARY_CITIES: usize = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    #[error("at most {MAX_SECONDARY_CITIES} secondary cities can be tracked")]
    MaxCitiesExceeded,
    #[error("city is already tracked")]
    DuplicateCity,
}

impl ValidationError {
    pub fn notice_key(&self) -> &'static str {
        match self {
            Self::MaxCitiesExceeded => "maxCitiesError",
            Self::DuplicateCity => "cityExistsError",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CityTracking {
    #[default]
    NoMainCity,
    HasMainOnly,
    HasMainPlusOne,
    HasMainPlusTwo,
}

/// Where an accepted city ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Main,
    Secondary(usize),
}

impl Settings {
    pub fn tracking(&self) -> CityTracking {
        match (&self.main_city, self.cities.len()) {
            (None, _) => CityTracking::NoMainCity,
            (Some(_), 0) => CityTracking::HasMainOnly,
            (Some(_), 1) => CityTracking::HasMainPlusOne,
            (Some(_), _) => CityTracking::HasMainPlusTwo,
        }
    }

    pub fn can_add_city(&self) -> bool {
        self.cities.len() < MAX_SECONDARY_CITIES
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.main_city.as_ref().is_some_and(|c| c.name == name) || self.cities.iter().any(|c| c.name == name)
    }

    pub fn find_city_mut(&mut self, name: &str) -> Option<&mut City> {
        self.main_city
            .iter_mut()
            .chain(self.cities.iter_mut())
            .find(|c| c.name == name)
    }

    /// Appends a secondary city. With no main city yet, the city becomes the
    /// main one instead.
    pub fn try_add_city(&mut self, city: City) -> Result<Placement, ValidationError> {
        if self.cities.len() >= MAX_SECONDARY_CITIES {
            return Err(ValidationError::MaxCitiesExceeded);
        }
        if self.is_tracked(&city.name) {
            return Err(ValidationError::DuplicateCity);
        }

        if self.main_city.is_none() {
            self.main_city = Some(city);
            self.is_first_visit = false;
            return Ok(Placement::Main);
        }

        self.cities.push(city);
        Ok(Placement::Secondary(self.cities.len() - 1))
    }

    /// Returns whether a city was removed. Unknown names are ignored.
    pub fn remove_secondary(&mut self, name: &str) -> bool {
        let before = self.cities.len();
        self.cities.retain(|c| c.name != name);
        self.cities.len() != before
    }

    /// Replaces the main city. A secondary entry with the same name is
    /// dropped so the name stays unique.
    pub fn replace_main(&mut self, city: City) {
        self.cities.retain(|c| c.name != city.name);
        self.main_city = Some(city);
        self.is_first_visit = false;
    }

    /// Swaps the named secondary city into the main slot; the previous main
    /// city moves to the front of the secondary list. Size is unchanged.
    pub fn promote_to_main(&mut self, name: &str) -> bool {
        let Some(index) = self.cities.iter().position(|c| c.name == name) else {
            return false;
        };

        let promoted = self.cities.remove(index);
        if let Some(old_main) = self.main_city.replace(promoted) {
            self.cities.insert(0, old_main);
        }
        self.is_first_visit = false;
        true
    }

    /// Restores the list invariants on hydrated state: a secondary list with
    /// no main city gives up its first entry as main, repeated names are
    /// dropped, and the list is cut to its maximum length. Returns whether
    /// anything changed.
    pub fn repair_cities(&mut self) -> bool {
        let before = (self.main_city.clone(), self.cities.len());

        if self.main_city.is_none() && !self.cities.is_empty() {
            self.main_city = Some(self.cities.remove(0));
            self.is_first_visit = false;
        }

        let mut seen: Vec<String> = self.main_city.iter().map(|c| c.name.clone()).collect();
        self.cities.retain(|c| {
            if seen.contains(&c.name) {
                false
            } else {
                seen.push(c.name.clone());
                true
            }
        });
        self.cities.truncate(MAX_SECONDARY_CITIES);

        before != (self.main_city.clone(), self.cities.len())
    }

    /// Main-city pick from search: the outgoing main city is kept as a
    /// secondary one when there is room for it.
    pub fn choose_main(&mut self, city: City) {
        if self.main_city.as_ref().is_some_and(|m| m.name == city.name) {
            self.main_city = Some(city);
            return;
        }

        self.cities.retain(|c| c.name != city.name);
        if let Some(old_main) = self.main_city.take() {
            if self.can_add_city() {
                self.cities.insert(0, old_main);
            }
        }
        self.main_city = Some(city);
        self.is_first_visit = false;
    }
}
