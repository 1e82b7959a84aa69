//! Pure merge rules between remote catalog content and locally authored
//! content. The store owns the local side; views feed both sides through
//! these functions before rendering, so the rules stay testable without I/O.

use forum_types::{Comment, Post, PostId};

/// Remote posts with local posts layered on top. A local post that shares a
/// remote id replaces that remote entry in place; local-only posts follow in
/// authoring order.
pub fn merge_posts(remote: Vec<Post>, local: &[Post]) -> Vec<Post> {
    let mut merged = remote;
    let mut appended: Vec<&Post> = Vec::new();
    for post in local {
        match merged.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => *slot = post.clone(),
            None => appended.push(post),
        }
    }
    merged.extend(appended.into_iter().cloned());
    merged
}

/// Single-post lookup with the local copy preferred over the remote one.
pub fn resolve_post(remote: Option<Post>, local: &[Post], id: PostId) -> Option<Post> {
    local.iter().find(|p| p.id == id).cloned().or(remote)
}

/// Remote comments first, then local comments authored against `post_id`,
/// each side keeping its own relative order.
pub fn comments_for_post(remote: Vec<Comment>, local: &[Comment], post_id: PostId) -> Vec<Comment> {
    let mut comments = remote;
    comments.extend(local.iter().filter(|c| c.post_id == post_id).cloned());
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: PostId, title: &str) -> Post {
        Post {
            id,
            user_id: 1,
            title: title.to_string(),
            body: format!("body of {title}"),
        }
    }

    fn comment(id: u64, post_id: PostId, body: &str) -> Comment {
        Comment {
            id,
            post_id,
            name: "Leanne Graham".to_string(),
            email: "Sincere@april.biz".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn local_post_overrides_the_remote_entry_with_the_same_id() {
        let remote = vec![post(1, "one"), post(2, "two"), post(3, "three")];
        let local = vec![post(2, "two, edited")];

        let merged = merge_posts(remote, &local);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].id, 2);
        assert_eq!(merged[1].title, "two, edited");
    }

    #[test]
    fn local_only_posts_append_after_remote_in_authoring_order() {
        let remote = vec![post(1, "one")];
        let local = vec![post(1700000000000, "first"), post(1700000000001, "second")];

        let merged = merge_posts(remote, &local);

        let titles: Vec<&str> = merged.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "first", "second"]);
    }

    #[test]
    fn merge_with_no_local_posts_is_the_remote_list() {
        let remote = vec![post(1, "one"), post(2, "two")];
        assert_eq!(merge_posts(remote.clone(), &[]), remote);
    }

    #[test]
    fn resolve_prefers_the_local_copy() {
        let local = vec![post(5, "local five")];
        let resolved = resolve_post(Some(post(5, "remote five")), &local, 5).unwrap();
        assert_eq!(resolved.title, "local five");
    }

    #[test]
    fn resolve_falls_back_to_remote_then_to_nothing() {
        assert_eq!(
            resolve_post(Some(post(5, "remote five")), &[], 5).unwrap().title,
            "remote five"
        );
        assert_eq!(resolve_post(None, &[], 5), None);
    }

    #[test]
    fn comments_keep_remote_first_and_filter_local_by_post() {
        let remote = vec![comment(1, 5, "c1"), comment(2, 5, "c2")];
        let local = vec![comment(100, 9, "other post"), comment(101, 5, "c3")];

        let assembled = comments_for_post(remote, &local, 5);

        let bodies: Vec<&str> = assembled.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["c1", "c2", "c3"]);
    }
}
