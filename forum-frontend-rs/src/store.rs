//! The persisted client state: session identity, per-post preference sets,
//! and locally authored posts and comments.
//!
//! Every mutation synchronously re-serializes the affected slot, so a reload
//! in the same browser observes exactly what the last mutation produced.
//! Slot keys match the original browser app, so state it wrote stays
//! readable.

use std::collections::BTreeSet;

use coinage::IdMint;
use forum_types::{Comment, CommentDraft, Post, PostId, User};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage::Storage;

pub(crate) const CURRENT_USER_KEY: &str = "currentUser";
pub(crate) const LIKED_POSTS_KEY: &str = "likedPosts";
pub(crate) const DISLIKED_POSTS_KEY: &str = "dislikedPosts";
pub(crate) const FAVORITE_POSTS_KEY: &str = "favoritePosts";
pub(crate) const USER_POSTS_KEY: &str = "userPosts";
pub(crate) const USER_COMMENTS_KEY: &str = "userComments";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] stowage::StorageError),

    #[error("stored value under {key:?} is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode value for {key:?}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub struct SessionStore<S> {
    storage: S,
    identity: Option<User>,
    liked: BTreeSet<PostId>,
    disliked: BTreeSet<PostId>,
    favorited: BTreeSet<PostId>,
    local_posts: Vec<Post>,
    local_comments: Vec<Comment>,
}

impl<S: Storage> SessionStore<S> {
    /// Empty state on top of `storage`. Nothing is read or written until the
    /// first mutation.
    pub fn empty(storage: S) -> Self {
        Self {
            storage,
            identity: None,
            liked: BTreeSet::new(),
            disliked: BTreeSet::new(),
            favorited: BTreeSet::new(),
            local_posts: Vec::new(),
            local_comments: Vec::new(),
        }
    }

    /// Load every slot. Absent slots default to empty/unset; a slot that
    /// fails to decode is an error naming the offending key.
    pub fn load(storage: S) -> Result<Self, StoreError> {
        let identity = read_slot(&storage, CURRENT_USER_KEY)?;
        let liked = read_slot(&storage, LIKED_POSTS_KEY)?.unwrap_or_default();
        let disliked = read_slot(&storage, DISLIKED_POSTS_KEY)?.unwrap_or_default();
        let favorited = read_slot(&storage, FAVORITE_POSTS_KEY)?.unwrap_or_default();
        let local_posts = read_slot(&storage, USER_POSTS_KEY)?.unwrap_or_default();
        let local_comments = read_slot(&storage, USER_COMMENTS_KEY)?.unwrap_or_default();
        Ok(Self {
            storage,
            identity,
            liked,
            disliked,
            favorited,
            local_posts,
            local_comments,
        })
    }

    /// Like [`SessionStore::load`], but a corrupt slot is logged and dropped
    /// instead of failing the whole load. The next mutation that touches the
    /// slot overwrites it. Backend failures still propagate.
    pub fn load_or_reset(storage: S) -> Result<Self, StoreError> {
        let identity = read_slot_lenient(&storage, CURRENT_USER_KEY)?;
        let liked = read_slot_lenient(&storage, LIKED_POSTS_KEY)?.unwrap_or_default();
        let disliked = read_slot_lenient(&storage, DISLIKED_POSTS_KEY)?.unwrap_or_default();
        let favorited = read_slot_lenient(&storage, FAVORITE_POSTS_KEY)?.unwrap_or_default();
        let local_posts = read_slot_lenient(&storage, USER_POSTS_KEY)?.unwrap_or_default();
        let local_comments = read_slot_lenient(&storage, USER_COMMENTS_KEY)?.unwrap_or_default();
        Ok(Self {
            storage,
            identity,
            liked,
            disliked,
            favorited,
            local_posts,
            local_comments,
        })
    }

    pub fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    pub fn liked(&self) -> &BTreeSet<PostId> {
        &self.liked
    }

    pub fn disliked(&self) -> &BTreeSet<PostId> {
        &self.disliked
    }

    pub fn favorited(&self) -> &BTreeSet<PostId> {
        &self.favorited
    }

    pub fn local_posts(&self) -> &[Post] {
        &self.local_posts
    }

    pub fn local_comments(&self) -> &[Comment] {
        &self.local_comments
    }

    /// Replace the session identity unconditionally. Logging out removes the
    /// slot instead of storing an empty encoding.
    pub fn set_identity(&mut self, user: Option<User>) -> Result<(), StoreError> {
        self.identity = user;
        match &self.identity {
            Some(user) => persist(&mut self.storage, CURRENT_USER_KEY, user),
            None => {
                self.storage.remove(CURRENT_USER_KEY)?;
                Ok(())
            }
        }
    }

    /// Flip liked-membership. Liking a post also clears any dislike on it, so
    /// a post is never both. Returns whether the post is liked afterwards.
    pub fn toggle_liked(&mut self, post_id: PostId) -> Result<bool, StoreError> {
        if self.liked.remove(&post_id) {
            persist(&mut self.storage, LIKED_POSTS_KEY, &self.liked)?;
            return Ok(false);
        }
        self.liked.insert(post_id);
        persist(&mut self.storage, LIKED_POSTS_KEY, &self.liked)?;
        if self.disliked.remove(&post_id) {
            persist(&mut self.storage, DISLIKED_POSTS_KEY, &self.disliked)?;
        }
        Ok(true)
    }

    /// Mirror image of [`SessionStore::toggle_liked`].
    pub fn toggle_disliked(&mut self, post_id: PostId) -> Result<bool, StoreError> {
        if self.disliked.remove(&post_id) {
            persist(&mut self.storage, DISLIKED_POSTS_KEY, &self.disliked)?;
            return Ok(false);
        }
        self.disliked.insert(post_id);
        persist(&mut self.storage, DISLIKED_POSTS_KEY, &self.disliked)?;
        if self.liked.remove(&post_id) {
            persist(&mut self.storage, LIKED_POSTS_KEY, &self.liked)?;
        }
        Ok(true)
    }

    /// Plain membership flip; independent of liked/disliked.
    pub fn toggle_favorited(&mut self, post_id: PostId) -> Result<bool, StoreError> {
        let favorited_now = if self.favorited.remove(&post_id) {
            false
        } else {
            self.favorited.insert(post_id);
            true
        };
        persist(&mut self.storage, FAVORITE_POSTS_KEY, &self.favorited)?;
        Ok(favorited_now)
    }

    /// Append an authored post. The caller supplies the id (see `coinage`).
    pub fn add_local_post(&mut self, post: Post) -> Result<(), StoreError> {
        self.local_posts.push(post);
        persist(&mut self.storage, USER_POSTS_KEY, &self.local_posts)
    }

    /// Remove the matching authored post; a miss is a no-op and writes
    /// nothing.
    pub fn remove_local_post(&mut self, post_id: PostId) -> Result<(), StoreError> {
        let before = self.local_posts.len();
        self.local_posts.retain(|p| p.id != post_id);
        if self.local_posts.len() == before {
            return Ok(());
        }
        persist(&mut self.storage, USER_POSTS_KEY, &self.local_posts)
    }

    /// Mint an id for the draft, append it, and hand back the stored comment.
    pub fn add_local_comment(
        &mut self,
        draft: CommentDraft,
        ids: &mut dyn IdMint,
    ) -> Result<Comment, StoreError> {
        let comment = Comment {
            id: ids.mint(),
            post_id: draft.post_id,
            name: draft.name,
            email: draft.email,
            body: draft.body,
        };
        self.local_comments.push(comment.clone());
        persist(&mut self.storage, USER_COMMENTS_KEY, &self.local_comments)?;
        Ok(comment)
    }
}

fn persist<S: Storage, T: Serialize>(
    storage: &mut S,
    key: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let encoded =
        serde_json::to_string(value).map_err(|source| StoreError::Encode { key, source })?;
    storage.set(key, &encoded)?;
    Ok(())
}

fn read_slot<S: Storage, T: DeserializeOwned>(
    storage: &S,
    key: &'static str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt { key, source })
}

fn read_slot_lenient<S: Storage, T: DeserializeOwned>(
    storage: &S,
    key: &'static str,
) -> Result<Option<T>, StoreError> {
    match read_slot(storage, key) {
        Ok(value) => Ok(value),
        Err(StoreError::Corrupt { key, source }) => {
            log::error!("Dropping corrupt stored value under {key:?}: {source}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinage::{ClockMint, SequenceMint};
    use forum_types::{Address, Company, Geo};
    use stowage::MemoryStorage;

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            username: name.to_lowercase(),
            email: format!("{}@april.biz", name.to_lowercase()),
            address: Address {
                street: "Kulas Light".to_string(),
                suite: "Apt. 556".to_string(),
                city: "Gwenborough".to_string(),
                zipcode: "92998-3874".to_string(),
                geo: Geo {
                    lat: "-37.3159".to_string(),
                    lng: "81.1496".to_string(),
                },
            },
            phone: "1-770-736-8031".to_string(),
            website: "hildegard.org".to_string(),
            company: Company {
                name: "Romaguera-Crona".to_string(),
                catch_phrase: "Multi-layered client-server neural-net".to_string(),
                bs: "harness real-time e-markets".to_string(),
            },
        }
    }

    fn post(id: PostId, user_id: u64, title: &str) -> Post {
        Post {
            id,
            user_id,
            title: title.to_string(),
            body: "body".to_string(),
        }
    }

    #[test]
    fn liking_clears_a_dislike() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        store.toggle_disliked(7).unwrap();
        assert!(store.disliked().contains(&7));

        store.toggle_liked(7).unwrap();
        assert!(store.liked().contains(&7));
        assert!(!store.disliked().contains(&7));
    }

    #[test]
    fn disliking_clears_a_like() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        store.toggle_liked(7).unwrap();
        store.toggle_disliked(7).unwrap();
        assert!(store.disliked().contains(&7));
        assert!(!store.liked().contains(&7));
    }

    #[test]
    fn toggling_twice_returns_to_the_original_state() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        assert!(store.toggle_liked(3).unwrap());
        assert!(!store.toggle_liked(3).unwrap());
        assert!(store.liked().is_empty());
    }

    #[test]
    fn favorites_are_independent_of_likes() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        store.toggle_liked(4).unwrap();
        store.toggle_favorited(4).unwrap();
        store.toggle_disliked(4).unwrap();
        assert!(store.favorited().contains(&4));
    }

    #[test]
    fn mutual_exclusion_reaches_the_persisted_slot() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::empty(storage.clone());
        store.toggle_disliked(7).unwrap();
        store.toggle_liked(7).unwrap();

        let raw = storage.get(DISLIKED_POSTS_KEY).unwrap().unwrap();
        let disliked: Vec<PostId> = serde_json::from_str(&raw).unwrap();
        assert!(!disliked.contains(&7));
    }

    #[test]
    fn identity_survives_a_reload() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::empty(storage.clone());
        store.set_identity(Some(user(7, "Leanne"))).unwrap();
        store.toggle_liked(2).unwrap();
        drop(store);

        let reloaded = SessionStore::load(storage).unwrap();
        assert_eq!(reloaded.identity().unwrap().id, 7);
        assert!(reloaded.liked().contains(&2));
    }

    #[test]
    fn logging_out_removes_the_identity_slot() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::empty(storage.clone());
        store.set_identity(Some(user(7, "Leanne"))).unwrap();
        assert!(storage.get(CURRENT_USER_KEY).unwrap().is_some());

        store.set_identity(None).unwrap();
        // The slot is gone, not an encoded null.
        assert_eq!(storage.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[test]
    fn authored_post_gets_an_id_outside_the_remote_fixture_range() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        let mut ids = ClockMint::new();

        let post = Post {
            id: ids.mint(),
            user_id: 7,
            title: "Hello".to_string(),
            body: "World".to_string(),
        };
        store.add_local_post(post.clone()).unwrap();

        let stored = &store.local_posts()[0];
        assert_eq!(stored.user_id, 7);
        assert_eq!(stored.title, "Hello");
        assert_eq!(stored.body, "World");
        assert!(![1, 2, 3].contains(&stored.id));
    }

    #[test]
    fn removing_an_absent_post_changes_nothing() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        store.add_local_post(post(10, 1, "a")).unwrap();
        store.add_local_post(post(11, 1, "b")).unwrap();

        store.remove_local_post(999).unwrap();

        let titles: Vec<&str> = store.local_posts().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn removing_a_post_persists_the_shrunken_list() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::empty(storage.clone());
        store.add_local_post(post(10, 1, "a")).unwrap();
        store.remove_local_post(10).unwrap();

        let raw = storage.get(USER_POSTS_KEY).unwrap().unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn comments_get_minted_ids_and_append_in_order() {
        let mut store = SessionStore::empty(MemoryStorage::new());
        let mut ids = SequenceMint::starting_at(500);

        let draft = |body: &str| CommentDraft {
            post_id: 5,
            name: "Leanne Graham".to_string(),
            email: "Sincere@april.biz".to_string(),
            body: body.to_string(),
        };

        let first = store.add_local_comment(draft("first"), &mut ids).unwrap();
        let second = store.add_local_comment(draft("second"), &mut ids).unwrap();

        assert_eq!(first.id, 500);
        assert_eq!(second.id, 501);
        assert_eq!(store.local_comments().len(), 2);
        assert_eq!(store.local_comments()[1].body, "second");
    }

    #[test]
    fn strict_load_names_the_corrupt_slot() {
        let mut storage = MemoryStorage::new();
        storage.set(LIKED_POSTS_KEY, "not json").unwrap();

        match SessionStore::load(storage) {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, LIKED_POSTS_KEY),
            other => panic!("expected Corrupt, got {other:?}", other = other.err()),
        }
    }

    #[test]
    fn lenient_load_drops_only_the_corrupt_slot() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::empty(storage.clone());
        store.set_identity(Some(user(7, "Leanne"))).unwrap();
        store.toggle_favorited(3).unwrap();
        drop(store);

        let mut broken = storage.clone();
        broken.set(FAVORITE_POSTS_KEY, "{oops").unwrap();

        let recovered = SessionStore::load_or_reset(storage).unwrap();
        assert_eq!(recovered.identity().unwrap().id, 7);
        assert!(recovered.favorited().is_empty());
    }
}
