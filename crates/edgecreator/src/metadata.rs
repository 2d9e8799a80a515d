//! Contributors and photos attached to an edge.

use serde::{Deserialize, Serialize};

pub use edgecreator_legacy::record::ContributionKind;

/// Users credited for an edge, by role, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributors {
    designers: Vec<String>,
    photographers: Vec<String>,
}

impl Contributors {
    pub fn designers(&self) -> &[String] {
        &self.designers
    }

    pub fn photographers(&self) -> &[String] {
        &self.photographers
    }

    /// Returns the users credited with `kind`.
    pub fn of_kind(&self, kind: ContributionKind) -> &[String] {
        match kind {
            ContributionKind::Designer => &self.designers,
            ContributionKind::Photographer => &self.photographers,
        }
    }

    /// Credits `user` with `kind`. Returns false if already credited.
    pub fn add(&mut self, kind: ContributionKind, user: impl Into<String>) -> bool {
        let user = user.into();
        let users = self.users_mut(kind);
        if users.contains(&user) {
            return false;
        }
        users.push(user);
        true
    }

    /// Removes the `kind` credit of `user`. Returns false if there was none.
    pub fn remove(&mut self, kind: ContributionKind, user: &str) -> bool {
        let users = self.users_mut(kind);
        let before = users.len();
        users.retain(|existing| existing != user);
        users.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.designers.is_empty() && self.photographers.is_empty()
    }

    fn users_mut(&mut self, kind: ContributionKind) -> &mut Vec<String> {
        match kind {
            ContributionKind::Designer => &mut self.designers,
            ContributionKind::Photographer => &mut self.photographers,
        }
    }
}

/// Side information gathered when resolving the primary issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    photos: Vec<String>,
    contributors: Contributors,
}

impl EdgeMetadata {
    pub fn new(photos: Vec<String>, contributors: Contributors) -> Self {
        Self {
            photos,
            contributors,
        }
    }

    /// File names of the photos the edge was drawn from.
    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn contributors(&self) -> &Contributors {
        &self.contributors
    }

    pub fn contributors_mut(&mut self) -> &mut Contributors {
        &mut self.contributors
    }

    /// Adds a photo unless it is already listed.
    pub fn add_photo(&mut self, photo: impl Into<String>) {
        let photo = photo.into();
        if !self.photos.contains(&photo) {
            self.photos.push(photo);
        }
    }
}
