//! Deterministic blob key layout, one function per purpose bucket.

use hx_models::{owner::OwnerId, scene::SceneId, video::VideoId};

pub fn upload_key(owner_id: &OwnerId, video_id: &VideoId, extension: &str) -> String {
    format!("uploads/{}/{}.{}", owner_id, video_id, extension)
}

pub fn thumbnail_key(owner_id: &OwnerId, video_id: &VideoId, scene_id: &SceneId) -> String {
    format!("thumbnails/{}/{}/{}.webp", owner_id, video_id, scene_id)
}

pub fn sidecar_key(owner_id: &OwnerId, video_id: &VideoId, scene_id: &SceneId) -> String {
    hx_models::Sidecar::key(owner_id, video_id, scene_id)
}

pub fn enrollment_photo_key(owner_id: &OwnerId, person_id: &hx_models::PersonId, index: usize) -> String {
    format!("people/{}/{}/photo-{}.jpg", owner_id, person_id, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_key_is_namespaced_by_owner_and_video() {
        let owner = OwnerId::new();
        let video = VideoId::new();
        let key = upload_key(&owner, &video, "mp4");
        assert!(key.starts_with(&format!("uploads/{}/{}", owner, video)));
        assert!(key.ends_with(".mp4"));
    }
}
