#![deny(clippy::string_slice)]

//! Browser client core for the demo forum catalog.
//!
//! The JS view layer constructs one [`Forum`] and drives everything through
//! it: reads go out to the remote catalog and come back merged with the
//! session's own authored content; writes land in the persisted session
//! store. There is no backend of our own, so local state is the source of
//! truth for everything the user authors.

pub mod catalog;
pub mod merge;
pub mod store;
mod utils;

use std::cell::RefCell;
use std::sync::LazyLock;

use coinage::{ClockMint, IdMint};
use forum_types::{Comment, CommentDraft, NewPost, Post, PostId, User, UserId};
use stowage::Storage;
use wasm_bindgen::prelude::*;

use crate::catalog::{Catalog, CatalogError};
use crate::store::SessionStore;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

/// The app handle the view layer holds. An explicit object, not an ambient
/// singleton: everything it owns is reachable only through it.
///
/// Store mutations are synchronous and persist before returning. Catalog
/// calls suspend the caller only; a component that goes away mid-request
/// just drops the eventual result.
#[wasm_bindgen]
pub struct Forum {
    // we never hold a borrow across an .await, which guarantees the absence
    // of "borrow while locked" panics when JS re-enters us from a callback
    store: RefCell<SessionStore<Box<dyn Storage>>>,
    ids: RefCell<ClockMint>,
    catalog: Catalog,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Forum {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new() -> Result<Forum, JsValue> {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        #[cfg(target_arch = "wasm32")]
        let storage: Box<dyn Storage> = Box::new(
            stowage::LocalStorage::new().map_err(|e| JsValue::from_str(&format!("{e:?}")))?,
        );
        #[cfg(not(target_arch = "wasm32"))]
        let storage: Box<dyn Storage> = Box::new(stowage::MemoryStorage::new());

        let store = SessionStore::load_or_reset(storage)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;

        Ok(Self {
            store: RefCell::new(store),
            ids: RefCell::new(ClockMint::new()),
            catalog: Catalog::new(),
        })
    }

    // =======
    // session identity
    // =======

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn current_user(&self) -> Option<User> {
        self.store.borrow().identity().cloned()
    }

    /// Log in as `user`, or pass nothing to log out. Saving an edited
    /// profile goes through here too: the edited user replaces the identity
    /// wholesale.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn set_current_user(&self, user: Option<User>) -> Result<(), JsValue> {
        self.store
            .borrow_mut()
            .set_identity(user)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn logout(&self) -> Result<(), JsValue> {
        self.set_current_user(None)
    }

    // =======
    // preference sets
    // =======

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn toggle_liked(&self, post_id: PostId) -> Result<bool, JsValue> {
        self.store
            .borrow_mut()
            .toggle_liked(post_id)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn toggle_disliked(&self, post_id: PostId) -> Result<bool, JsValue> {
        self.store
            .borrow_mut()
            .toggle_disliked(post_id)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn toggle_favorited(&self, post_id: PostId) -> Result<bool, JsValue> {
        self.store
            .borrow_mut()
            .toggle_favorited(post_id)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn is_liked(&self, post_id: PostId) -> bool {
        self.store.borrow().liked().contains(&post_id)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn is_disliked(&self, post_id: PostId) -> bool {
        self.store.borrow().disliked().contains(&post_id)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn is_favorited(&self, post_id: PostId) -> bool {
        self.store.borrow().favorited().contains(&post_id)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn liked_posts(&self) -> Vec<PostId> {
        self.store.borrow().liked().iter().copied().collect()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn disliked_posts(&self) -> Vec<PostId> {
        self.store.borrow().disliked().iter().copied().collect()
    }

    /// Id list for the favorites tab; the view filters the merged post list
    /// with it.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn favorite_posts(&self) -> Vec<PostId> {
        self.store.borrow().favorited().iter().copied().collect()
    }

    // =======
    // authored content
    // =======

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn local_posts(&self) -> Vec<Post> {
        self.store.borrow().local_posts().to_vec()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn local_comments(&self) -> Vec<Comment> {
        self.store.borrow().local_comments().to_vec()
    }

    /// Whether `post_id` is one of the session's own posts, which is what
    /// decides if a delete affordance is shown.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn is_local_post(&self, post_id: PostId) -> bool {
        self.store
            .borrow()
            .local_posts()
            .iter()
            .any(|p| p.id == post_id)
    }

    /// Author a post as the current user. The post lives in local state; the
    /// create is mirrored to the demo catalog best-effort, and the echo is
    /// discarded because the catalog never keeps it.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn create_post(&self, title: String, body: String) -> Result<Post, JsValue> {
        let user_id = self
            .store
            .borrow()
            .identity()
            .map(|u| u.id)
            .ok_or_else(|| JsValue::from_str("no active session"))?;

        let post = Post {
            id: self.ids.borrow_mut().mint(),
            user_id,
            title,
            body,
        };
        self.store
            .borrow_mut()
            .add_local_post(post.clone())
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;

        let mirrored = NewPost {
            user_id,
            title: post.title.clone(),
            body: post.body.clone(),
        };
        if let Err(e) = self.catalog.create_post(&mirrored).await {
            log::warn!("Mirroring created post to the catalog failed: {e}");
        }

        Ok(post)
    }

    /// Drop one of the session's own posts and fire the matching remote
    /// delete (fire-and-forget; the demo catalog ignores it anyway).
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn remove_post(&self, post_id: PostId) -> Result<(), JsValue> {
        self.store
            .borrow_mut()
            .remove_local_post(post_id)
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;

        if let Err(e) = self.catalog.delete_post(post_id).await {
            log::warn!("Deleting post {post_id} on the catalog failed: {e}");
        }
        Ok(())
    }

    /// Author a comment on `post_id`; author name and email come from the
    /// current identity.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn add_comment(&self, post_id: PostId, body: String) -> Result<Comment, JsValue> {
        let (name, email) = {
            let store = self.store.borrow();
            let user = store
                .identity()
                .ok_or_else(|| JsValue::from_str("no active session"))?;
            (user.name.clone(), user.email.clone())
        };

        let draft = CommentDraft {
            post_id,
            name,
            email,
            body,
        };
        self.store
            .borrow_mut()
            .add_local_comment(draft, &mut *self.ids.borrow_mut())
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    // =======
    // catalog reads, merged with session content
    // =======

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn users(&self) -> Result<Vec<User>, JsValue> {
        self.catalog
            .users()
            .await
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn user(&self, id: UserId) -> Result<User, JsValue> {
        self.catalog
            .user(id)
            .await
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))
    }

    /// Remote posts merged with the session's own; local entries win on id
    /// collisions.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn all_posts(&self) -> Result<Vec<Post>, JsValue> {
        let remote = self
            .catalog
            .posts()
            .await
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;
        let local = self.store.borrow().local_posts().to_vec();
        Ok(merge::merge_posts(remote, &local))
    }

    /// Single post with the local copy preferred. A locally authored post can
    /// shadow a remote id entirely, so a remote miss is only fatal when
    /// there is no local copy either.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn post(&self, id: PostId) -> Result<Post, JsValue> {
        let remote = match self.catalog.post(id).await {
            Ok(post) => Some(post),
            Err(CatalogError::NotFound { .. }) => None,
            Err(e) => return Err(JsValue::from_str(&format!("{e:?}"))),
        };
        let local = self.store.borrow().local_posts().to_vec();
        merge::resolve_post(remote, &local, id)
            .ok_or_else(|| JsValue::from_str("post not found"))
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn posts_by_user(&self, user_id: UserId) -> Result<Vec<Post>, JsValue> {
        let remote = self
            .catalog
            .posts_by_user(user_id)
            .await
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;
        let local: Vec<Post> = self
            .store
            .borrow()
            .local_posts()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(merge::merge_posts(remote, &local))
    }

    /// Remote comments first, then the session's comments on this post.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>, JsValue> {
        let remote = self
            .catalog
            .comments_for_post(post_id)
            .await
            .map_err(|e| JsValue::from_str(&format!("{e:?}")))?;
        let local = self.store.borrow().local_comments().to_vec();
        Ok(merge::comments_for_post(remote, &local, post_id))
    }
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
