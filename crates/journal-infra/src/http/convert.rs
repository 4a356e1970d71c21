//! Wire DTO to domain conversions.

use uuid::Uuid;

use journal_core::domain::{
    AuthorSummary, Category, Cursor, FeedPage, PostDetail, PostSummary, Profile,
};
use journal_core::error::ApiError;
use journal_shared::dto::{FeedPageResponse, PostDetailDto, PostDto, UserDto};

pub(crate) fn profile_from_dto(dto: UserDto) -> Profile {
    Profile {
        id: dto.id,
        external_id: dto.uid,
        username: dto.username,
        name: dto.name,
        bio: dto.bio,
        photo_url: dto.photo_url,
        created_at: dto.created_at,
    }
}

pub(crate) fn post_from_dto(dto: PostDto, viewer: Option<Uuid>) -> Result<PostSummary, ApiError> {
    let category: Category = dto
        .category
        .parse()
        .map_err(|e: journal_core::domain::UnknownCategory| ApiError::Decode(e.to_string()))?;

    Ok(PostSummary {
        id: dto.id,
        title: dto.title,
        thumbnail: dto.thumbnail,
        category,
        other_category: dto.other_category.filter(|_| category == Category::Other),
        author: AuthorSummary {
            name: dto.user.name,
            username: dto.user.username,
            photo_url: dto.user.photo_url,
        },
        created_at: dto.created_at,
        like_count: dto.like_count.unwrap_or(dto.likes.len() as u64),
        liked_by_viewer: viewer.is_some_and(|v| dto.likes.contains(&v)),
    })
}

pub(crate) fn detail_from_dto(
    dto: PostDetailDto,
    viewer: Option<Uuid>,
) -> Result<PostDetail, ApiError> {
    Ok(PostDetail {
        summary: post_from_dto(dto.post, viewer)?,
        body: dto.content,
    })
}

pub(crate) fn page_from_dto(dto: FeedPageResponse, viewer: Option<Uuid>) -> Result<FeedPage, ApiError> {
    let posts = dto
        .posts
        .into_iter()
        .map(|post| post_from_dto(post, viewer))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeedPage {
        posts,
        next_cursor: dto
            .next_page
            .filter(|value| !value.is_null())
            .map(Cursor::from_value),
    })
}
